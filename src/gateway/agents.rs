/// User-agent markers for crawler and link-preview traffic. Matching
/// requests may read room metadata without consuming a participant slot,
/// so sharing a room link does not burn a seat on the preview fetch.
const AGENT_MARKERS: [&str; 10] = [
    "bot", "crawler", "spider", "crawling", "whatsapp", "telegram", "facebook", "twitter",
    "linkedin", "slack",
];

/// Check whether a user-agent string identifies automated traffic
pub fn is_automated_agent(user_agent: &str) -> bool {
    let user_agent = user_agent.to_lowercase();
    AGENT_MARKERS
        .iter()
        .any(|marker| user_agent.contains(marker))
}
