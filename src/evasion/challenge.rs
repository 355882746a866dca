/// Recognizes anti-bot verification pages by status and body text.
#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    markers: Vec<String>,
}

impl ChallengeDetector {
    pub fn new(markers: &[String]) -> Self {
        Self {
            markers: markers.iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    pub fn is_challenge(&self, status: u16, body: &str) -> bool {
        let blocked_status = matches!(status, 403 | 429 | 503);
        let lower = body.to_lowercase();
        let marked = self.markers.iter().any(|m| lower.contains(m));

        // A body with a marker is a challenge regardless of status; some WAFs
        // answer 200 with an interstitial.
        marked || (blocked_status && looks_like_interstitial(&lower))
    }
}

/// Tiny script-only documents served with a blocking status.
fn looks_like_interstitial(lower: &str) -> bool {
    lower.contains("<script") && lower.len() < 4096
}
