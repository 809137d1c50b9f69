//! Merge token table — every placeholder the engine recognizes, with
//! its extractor. Adding a token means adding a variant here; the
//! substitution loop and the rewrite-protection round trip both walk
//! `MergeToken::ALL`.

use coldreach_core::types::{Contact, SenderProfile};

/// A bracketed placeholder resolved to a concrete value at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeToken {
    Name,
    CompanyName,
    JobTitle,
    YourName,
    YourProfession,
    YourSkills,
    YourExperience,
    YourKeyExperience,
    YourAchievements,
    YourPhone,
    YourEmail,
    YourWebsiteUrl,
    Footer,
}

impl MergeToken {
    pub const ALL: [MergeToken; 13] = [
        MergeToken::Name,
        MergeToken::CompanyName,
        MergeToken::JobTitle,
        MergeToken::YourName,
        MergeToken::YourProfession,
        MergeToken::YourSkills,
        MergeToken::YourExperience,
        MergeToken::YourKeyExperience,
        MergeToken::YourAchievements,
        MergeToken::YourPhone,
        MergeToken::YourEmail,
        MergeToken::YourWebsiteUrl,
        MergeToken::Footer,
    ];

    /// The literal placeholder as it appears in template text.
    pub fn literal(self) -> &'static str {
        match self {
            Self::Name => "[Name]",
            Self::CompanyName => "[Company Name]",
            Self::JobTitle => "[Job Title]",
            Self::YourName => "[Your Name]",
            Self::YourProfession => "[Your Profession]",
            Self::YourSkills => "[Your Skills]",
            Self::YourExperience => "[Your Experience]",
            Self::YourKeyExperience => "[Your Key Experience]",
            Self::YourAchievements => "[Your Achievements]",
            Self::YourPhone => "[Your Phone]",
            Self::YourEmail => "[Your Email]",
            Self::YourWebsiteUrl => "[Your Website URL]",
            Self::Footer => "[Footer]",
        }
    }

    /// Resolve this token against a recipient and sender profile.
    /// Every arm has a safe default — tokens never leak literally.
    /// `[Footer]` is structural and handled by the personalizer, not here.
    pub fn resolve(self, contact: &Contact, profile: &SenderProfile) -> String {
        match self {
            Self::Name => first_name(&contact.name),
            Self::CompanyName => non_empty(&contact.company, "your company"),
            Self::JobTitle => "the role".to_string(),
            Self::YourName => non_empty(&profile.name, "a professional contact"),
            Self::YourProfession => non_empty(&profile.profession, "Software Engineer"),
            Self::YourSkills => {
                if profile.skills.is_empty() {
                    "my relevant skills".to_string()
                } else {
                    profile.skills.join(", ")
                }
            }
            Self::YourExperience | Self::YourKeyExperience => experience_phrase(profile.experience),
            Self::YourAchievements => profile
                .achievements
                .first()
                .cloned()
                .unwrap_or_else(|| "a key achievement".to_string()),
            Self::YourPhone => profile.phone.clone(),
            Self::YourEmail => profile.email.clone(),
            Self::YourWebsiteUrl => profile.website.clone(),
            Self::Footer => String::new(),
        }
    }
}

/// First whitespace-delimited token of a recipient name, or "there".
fn first_name(name: &str) -> String {
    name.split_whitespace()
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| "there".to_string())
}

fn non_empty(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// "3 years of experience", "1 year of experience", or "my experience"
/// when the profile leaves the field unset.
fn experience_phrase(years: u32) -> String {
    match years {
        0 => "my experience".to_string(),
        1 => "1 year of experience".to_string(),
        n => format!("{n} years of experience"),
    }
}
