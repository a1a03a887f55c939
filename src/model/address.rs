//! Mailbox addresses as they appear in From/To/Cc/Bcc (RFC 5322 §3.4).

/// A single mailbox: optional display name plus the bare address.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Display name, empty when the header only carried the address.
    pub name: String,
    /// The `local@domain` part.
    pub email: String,
}

impl Address {
    /// Parse one mailbox.
    ///
    /// Accepts `user@host`, `<user@host>`, `Name <user@host>` and
    /// `"Quoted, Name" <user@host>`. Anything else ends up verbatim in `email`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                return Self {
                    name: unquote(&trimmed[..open]),
                    email: trimmed[open + 1..close].trim().to_string(),
                };
            }
        }

        Self {
            name: String::new(),
            email: trimmed.to_string(),
        }
    }

    /// Parse a comma-separated mailbox list, honouring quotes and angle brackets.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut out = Vec::new();
        let mut start = 0;
        let mut quoted = false;
        let mut angle = false;

        for (pos, ch) in raw.char_indices() {
            match ch {
                '"' => quoted = !quoted,
                '<' if !quoted => angle = true,
                '>' if !quoted => angle = false,
                ',' if !quoted && !angle => {
                    push_non_empty(&mut out, &raw[start..pos]);
                    start = pos + 1;
                }
                _ => {}
            }
        }
        push_non_empty(&mut out, &raw[start..]);

        out
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            f.write_str(&self.email)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

/// Render an address list the way the header summary and header filters see it.
pub fn format_addresses(list: &[Address]) -> String {
    list.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_non_empty(out: &mut Vec<Address>, segment: &str) {
    let addr = Address::parse(segment);
    if !addr.email.is_empty() {
        out.push(addr);
    }
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
        .trim()
        .to_string()
}
