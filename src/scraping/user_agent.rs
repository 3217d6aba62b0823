use rand::seq::IndexedRandom;

/// Realistic desktop and mobile user agents rotated across page fetches.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// First entry, used when rotation is disabled.
pub const STABLE_USER_AGENT: &str = USER_AGENTS[0];

/// A random agent when `rotate` is set, otherwise the stable one.
pub fn pick_user_agent(rotate: bool) -> &'static str {
    if !rotate {
        return STABLE_USER_AGENT;
    }
    let mut rng = rand::rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(STABLE_USER_AGENT)
}

/// Headers sent with every page request alongside the user agent.
pub fn browser_headers() -> [(&'static str, &'static str); 3] {
    [
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_only_picks_known_agents() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&pick_user_agent(true)));
        }
        assert_eq!(pick_user_agent(false), STABLE_USER_AGENT);
    }
}
