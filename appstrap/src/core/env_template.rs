//! Line-oriented `KEY=VALUE` template rendering.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::config::{Configuration, Database};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(#\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*=").expect("placeholder regex is valid")
});

/// Environment values derived from a configuration, keyed by variable name.
pub fn env_values(config: &Configuration) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    values.insert("APP_NAME".to_string(), config.project_name.clone());

    match &config.database {
        Database::Sqlite => {
            values.insert("DB_CONNECTION".to_string(), "sqlite".to_string());
        }
        Database::Mysql(conn) | Database::Postgres(conn) => {
            values.insert(
                "DB_CONNECTION".to_string(),
                config.database.driver().as_str().to_string(),
            );
            values.insert("DB_HOST".to_string(), conn.host.clone());
            values.insert("DB_PORT".to_string(), conn.port.to_string());
            values.insert("DB_DATABASE".to_string(), conn.name.clone());
            values.insert("DB_USERNAME".to_string(), conn.user.clone());
            values.insert("DB_PASSWORD".to_string(), conn.password.clone());
        }
        Database::Skipped => {}
    }
    values
}

/// Rewrite the placeholder line of every key in `values`.
///
/// The placeholder is the first active `KEY=` line, or the first commented
/// `# KEY=` line when no active one exists. Only that line changes; keys without
/// a placeholder are not added. Rendering the output again with the same values
/// yields the same text.
pub fn render(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut lines: Vec<String> = template.split('\n').map(str::to_string).collect();

    for (key, value) in values {
        let Some(index) = placeholder_index(&lines, key) else {
            continue;
        };
        let ending = if lines[index].ends_with('\r') { "\r" } else { "" };
        lines[index] = format!("{key}={}{ending}", format_value(value));
    }

    lines.join("\n")
}

fn placeholder_index(lines: &[String], key: &str) -> Option<usize> {
    let mut commented = None;
    for (index, line) in lines.iter().enumerate() {
        let Some(captures) = PLACEHOLDER.captures(line) else {
            continue;
        };
        if &captures[2] != key {
            continue;
        }
        if captures.get(1).is_none() {
            return Some(index);
        }
        commented.get_or_insert(index);
    }
    commented
}

fn format_value(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\'));
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Configuration, Connection, default_values};
    use proptest::prelude::*;

    const LARAVEL_STYLE: &str = "APP_NAME=Laravel\nAPP_ENV=local\n\nDB_CONNECTION=sqlite\n# DB_HOST=127.0.0.1\n# DB_PORT=3306\n# DB_DATABASE=laravel\n# DB_USERNAME=root\n# DB_PASSWORD=\n";

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sqlite_config() -> Configuration {
        Configuration::from_raw("shop", &default_values("shop")).expect("config")
    }

    #[test]
    fn sqlite_leaves_host_and_port_commented() {
        let out = render(LARAVEL_STYLE, &env_values(&sqlite_config()));
        assert_eq!(
            out.lines().filter(|l| *l == "DB_CONNECTION=sqlite").count(),
            1
        );
        assert!(out.contains("# DB_HOST=127.0.0.1"));
        assert!(out.contains("# DB_PORT=3306"));
        assert!(!out.lines().any(|l| l.starts_with("DB_HOST=")));
        assert!(out.starts_with("APP_NAME=shop\n"));
    }

    #[test]
    fn network_driver_activates_commented_lines() {
        let mut config = sqlite_config();
        config.database = Database::Postgres(Connection {
            host: "db.internal".to_string(),
            port: 5432,
            name: "shop".to_string(),
            user: "app".to_string(),
            password: "p@ss word".to_string(),
        });
        let out = render(LARAVEL_STYLE, &env_values(&config));
        assert!(out.contains("DB_CONNECTION=pgsql\n"));
        assert!(out.contains("DB_HOST=db.internal\n"));
        assert!(out.contains("DB_PORT=5432\n"));
        assert!(out.contains("DB_PASSWORD=\"p@ss word\"\n"));
        assert!(!out.contains("# DB_HOST"));
    }

    #[test]
    fn active_line_wins_over_commented_duplicate() {
        let template = "# DB_HOST=old\nDB_HOST=current\n";
        let out = render(template, &values(&[("DB_HOST", "new")]));
        assert_eq!(out, "# DB_HOST=old\nDB_HOST=new\n");
    }

    #[test]
    fn keys_without_placeholder_are_not_added() {
        let out = render("APP_ENV=local\n", &values(&[("MISSING", "x")]));
        assert_eq!(out, "APP_ENV=local\n");
    }

    #[test]
    fn crlf_endings_are_preserved() {
        let out = render("APP_NAME=x\r\nAPP_ENV=local\r\n", &values(&[("APP_NAME", "y")]));
        assert_eq!(out, "APP_NAME=y\r\nAPP_ENV=local\r\n");
    }

    #[test]
    fn quoting_escapes_backslashes_and_quotes() {
        assert_eq!(format_value(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(format_value(""), "");
        assert_eq!(format_value("plain"), "plain");
    }

    #[test]
    fn line_breaks_in_values_stay_on_one_line() {
        let vals = values(&[("DB_PASSWORD", "a\nDB_HOST=evil\r")]);
        let once = render("DB_PASSWORD=\nOTHER=1\n", &vals);
        assert_eq!(once, "DB_PASSWORD=\"a\\nDB_HOST=evil\\r\"\nOTHER=1\n");
        assert_eq!(render(&once, &vals), once);
    }

    proptest! {
        #[test]
        fn render_is_idempotent(
            template in prop::collection::vec(
                prop_oneof![
                    "[A-C]{1,2}=[a-z ]{0,4}",
                    "# ?[A-C]{1,2}=[a-z]{0,4}",
                    "[a-z #=]{0,8}",
                ],
                0..12,
            ).prop_map(|lines| lines.join("\n")),
            vals in prop::collection::btree_map("[A-C]{1,2}", "[a-z \"#$\\\\\n\r]{0,6}", 0..5),
        ) {
            let once = render(&template, &vals);
            let twice = render(&once, &vals);
            prop_assert_eq!(once, twice);
        }
    }
}
