use serde::Deserialize;

use crate::evasion::EvasionConfig;

/// What the in-page probe reports on each poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProbeReport {
    /// A success selector matched (or, with none configured, the document finished loading)
    pub ready: bool,
    /// A challenge marker appears in the title or visible text
    pub challenged: bool,
}

impl ProbeReport {
    pub fn passed(&self) -> bool {
        self.ready && !self.challenged
    }
}

/// Builds the JavaScript evaluated in the page while waiting for verification to clear.
pub struct ProbeScript {
    config: EvasionConfig,
}

impl ProbeScript {
    pub fn new(config: EvasionConfig) -> Self {
        Self { config }
    }

    /// Returns `{ ready, challenged }` for the current document.
    pub fn source(&self) -> String {
        let selectors = js_string_list(&self.config.success_selectors);
        let markers = js_string_list(
            &self
                .config
                .challenge_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect::<Vec<_>>(),
        );

        format!(
            r#"
            (() => {{
                const selectors = [{selectors}];
                const markers = [{markers}];

                const title = (document.title || '').toLowerCase();
                const text = document.body ? (document.body.innerText || '').toLowerCase() : '';
                const challenged = markers.some(m => title.includes(m) || text.includes(m));

                let ready = false;
                if (selectors.length === 0) {{
                    ready = document.readyState === 'complete';
                }} else {{
                    for (const selector of selectors) {{
                        try {{
                            if (document.querySelector(selector)) {{
                                ready = true;
                                break;
                            }}
                        }} catch (e) {{}}
                    }}
                }}

                return {{ ready: ready, challenged: challenged }};
            }})()
            "#
        )
    }
}

fn js_string_list(values: &[String]) -> String {
    values
        .iter()
        .map(|s| format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect::<Vec<_>>()
        .join(", ")
}
