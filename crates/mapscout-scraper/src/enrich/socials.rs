use std::sync::LazyLock;

use regex::Regex;

/// Platforms scanned for, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialPlatform {
    Facebook,
    Instagram,
    Twitter,
    LinkedIn,
    TikTok,
    YouTube,
    Snapchat,
}

impl SocialPlatform {
    pub const ALL: [SocialPlatform; 7] = [
        SocialPlatform::Facebook,
        SocialPlatform::Instagram,
        SocialPlatform::Twitter,
        SocialPlatform::LinkedIn,
        SocialPlatform::TikTok,
        SocialPlatform::YouTube,
        SocialPlatform::Snapchat,
    ];

    fn pattern(self) -> &'static Regex {
        match self {
            SocialPlatform::Facebook => &FACEBOOK_RE,
            SocialPlatform::Instagram => &INSTAGRAM_RE,
            SocialPlatform::Twitter => &TWITTER_RE,
            SocialPlatform::LinkedIn => &LINKEDIN_RE,
            SocialPlatform::TikTok => &TIKTOK_RE,
            SocialPlatform::YouTube => &YOUTUBE_RE,
            SocialPlatform::Snapchat => &SNAPCHAT_RE,
        }
    }
}

static FACEBOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.|m\.|web\.)?(?:facebook|fb)\.com/[^\s'\x22<>]+")
        .expect("valid regex")
});
static INSTAGRAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?instagram\.com/[^\s'\x22<>]+").expect("valid regex")
});
static TWITTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.|mobile\.)?(?:twitter|x)\.com/[^\s'\x22<>]+")
        .expect("valid regex")
});
static LINKEDIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:[a-z]{2,3}\.)?linkedin\.com/(?:company|in|school)/[^\s'\x22<>]+")
        .expect("valid regex")
});
static TIKTOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?tiktok\.com/@[^\s'\x22<>]+").expect("valid regex")
});
static YOUTUBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?youtube\.com/(?:@|channel/|c/|user/)[^\s'\x22<>]+")
        .expect("valid regex")
});
static SNAPCHAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?snapchat\.com/add/[^\s'\x22<>]+").expect("valid regex")
});

/// Share buttons, tracking pixels, and embeds that point at the platform
/// rather than the business profile.
const NON_PROFILE_MARKERS: &[&str] = &[
    "/sharer",
    "/share",
    "/intent/",
    "/plugins/",
    "/dialog/",
    "/tr?",
    "/tr/",
    "/embed",
    "/hashtag/",
];

/// Scans every page in order and keeps the first profile link per
/// platform, at most `max` in total.
#[must_use]
pub fn extract_socials<S: AsRef<str>>(pages: &[S], max: usize) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for (rank, platform) in SocialPlatform::ALL.iter().enumerate() {
        let first = pages.iter().find_map(|page| {
            platform
                .pattern()
                .find_iter(page.as_ref())
                .map(|m| clean_profile_url(m.as_str()))
                .find(|url| is_profile_link(url))
        });
        if let Some(url) = first {
            found.push((rank, url));
        }
    }
    found.sort_by_key(|(rank, _)| *rank);
    found.into_iter().take(max).map(|(_, url)| url).collect()
}

fn clean_profile_url(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ')' | '\\'))
        .to_string()
}

fn is_profile_link(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    !NON_PROFILE_MARKERS.iter().any(|m| lowered.contains(m))
}
