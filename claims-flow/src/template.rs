/// Values substituted into narrative and validation templates.
#[derive(Debug, Clone, Default)]
pub struct Vars {
    pairs: Vec<(&'static str, String)>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces every `{key}` with its value. Unknown placeholders are left as written.
    pub fn fill(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            match tail.find('}') {
                Some(close) => {
                    let key = &tail[1..close];
                    match self.get(key) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&tail[..=close]),
                    }
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_known_keys() {
        let mut vars = Vars::new();
        vars.set("hours", "24").set("amount", "800").set("currency", "$");

        assert_eq!(
            vars.fill("{hours} hours ÷ 6 × {currency}200 = {currency}{amount}"),
            "24 hours ÷ 6 × $200 = $800"
        );
    }

    #[test]
    fn test_fill_keeps_unknown_and_unbalanced_braces() {
        let mut vars = Vars::new();
        vars.set("flight", "SQ883");

        assert_eq!(vars.fill("{flight} {gate} {"), "SQ883 {gate} {");
    }

    #[test]
    fn test_set_overwrites() {
        let mut vars = Vars::new();
        vars.set("reason", "Riot / Strike").set("reason", "Natural Disaster");
        assert_eq!(vars.get("reason"), Some("Natural Disaster"));
    }
}
