use crate::database::models::{AccountHousehold, Household, LevelState, Member, ScoreEntry, Task};

/// Escape markup in user-supplied display strings.
///
/// Only angle brackets are rewritten, so quotes and ampersands in names like
/// `Tom & "Jerry"` come back unchanged while `<script>` cannot render.
/// Escaping an already escaped string is a no-op.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Records whose display strings are escaped before leaving the service
pub trait Escaped {
    fn escaped(self) -> Self;
}

impl<T: Escaped> Escaped for Vec<T> {
    fn escaped(self) -> Self {
        self.into_iter().map(Escaped::escaped).collect()
    }
}

impl Escaped for Household {
    fn escaped(mut self) -> Self {
        self.name = escape_html(&self.name);
        self
    }
}

impl Escaped for Member {
    fn escaped(mut self) -> Self {
        self.name = escape_html(&self.name);
        self.username = escape_html(&self.username);
        self
    }
}

impl Escaped for Task {
    fn escaped(mut self) -> Self {
        self.title = escape_html(&self.title);
        self
    }
}

impl Escaped for ScoreEntry {
    fn escaped(mut self) -> Self {
        self.name = escape_html(&self.name);
        self
    }
}

impl Escaped for LevelState {
    fn escaped(mut self) -> Self {
        self.name = escape_html(&self.name);
        self
    }
}

impl Escaped for AccountHousehold {
    fn escaped(mut self) -> Self {
        self.user = escape_html(&self.user);
        self.housename = escape_html(&self.housename);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_script_tags() {
        assert_eq!(
            escape_html(r#"A Foul Name <script>alert("xss");</script>"#),
            r#"A Foul Name &lt;script&gt;alert("xss");&lt;/script&gt;"#
        );
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(escape_html("Tom & \"Jerry\""), "Tom & \"Jerry\"");
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn escaping_twice_changes_nothing() {
        let once = escape_html("<b>chores</b>");
        assert_eq!(escape_html(&once), once);
    }

    #[test]
    fn households_escape_their_name() {
        let households = vec![Household { id: 1, name: "<i>home</i>".to_string(), user_id: 1 }];
        assert_eq!(households.escaped()[0].name, "&lt;i&gt;home&lt;/i&gt;");
    }
}
