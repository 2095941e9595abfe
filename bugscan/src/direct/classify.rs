//! Server fingerprint classification.
//!
//! Turns the `Server`, `CF-RAY` and `Location` response headers into a
//! group name, a display label and a color.
use colored::{ColoredString, Colorize};
use reqwest::header::{HeaderMap, LOCATION, SERVER};
use serde::Serialize;

use crate::config::ServerList;

/// Redirect target some carriers send instead of the real page. A target
/// answering with it is dropped entirely.
pub const BALANCE_EXHAUST: &str = "https://jio.com/BalanceExhaust";

/// Group for servers that are not on the server list.
pub const OTHERS: &str = "others";

/// Terminal color of a result line or report group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    Green,
    Yellow,
    Cyan,
    White,
    Magenta,
    Blue,
    BrightYellow,
    BrightMagenta,
    Grey,
}

impl Palette {
    /// Color family of a known server name.
    pub fn for_server(name: &str) -> Option<Self> {
        let palette = match name {
            "cloudflare" => Self::Green,
            "akamaighost" | "akamai" => Self::Yellow,
            "cloudfront" | "amazons3" => Self::Cyan,
            "apache" | "nginx" => Self::White,
            "varnish" | "fastly" => Self::Magenta,
            "microsoft" | "azure" => Self::Blue,
            "cachefly" | "alibaba" => Self::BrightYellow,
            "tencent" => Self::BrightMagenta,
            _ => return None,
        };
        Some(palette)
    }

    pub fn paint(self, text: &str) -> ColoredString {
        match self {
            Self::Green => text.green(),
            Self::Yellow => text.yellow(),
            Self::Cyan => text.cyan(),
            Self::White => text.white(),
            Self::Magenta => text.magenta(),
            Self::Blue => text.blue(),
            Self::BrightYellow => text.bright_yellow(),
            Self::BrightMagenta => text.bright_magenta(),
            Self::Grey => text.bright_black(),
        }
    }
}

/// The response headers classification looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHeaders {
    pub server: String,
    pub cf_ray: Option<String>,
    pub location: Option<String>,
}

impl ServerHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .filter(|v| !v.is_empty())
        };

        Self {
            server: get(SERVER.as_str()).unwrap_or_default(),
            cf_ray: get("cf-ray"),
            location: get(LOCATION.as_str()),
        }
    }
}

/// Where a response belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Report group: a server list entry or [`OTHERS`].
    pub group: String,
    /// Server name shown on the result line.
    pub label: String,
    pub palette: Palette,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Drop the whole target.
    Abort,
    Hit(Classification),
}

pub fn classify(servers: &ServerList, headers: &ServerHeaders) -> Verdict {
    if headers.location.as_deref() == Some(BALANCE_EXHAUST) {
        return Verdict::Abort;
    }

    let server = headers.server.as_str();
    let lower = server.to_lowercase();

    // Cloudflare in front of an origin that rewrites the Server header.
    let hidden_cloudflare =
        servers.contains("cloudflare") && headers.cf_ray.is_some() && lower != "cloudflare";

    if hidden_cloudflare {
        let label = if server.is_empty() {
            "(cf)".to_string()
        } else {
            format!("{server} (cf)")
        };
        return Verdict::Hit(Classification {
            group: "cloudflare".to_string(),
            label,
            palette: Palette::Green,
        });
    }

    if servers.contains(&lower) {
        let palette = if servers.len() == 1 {
            Palette::Green
        } else {
            Palette::for_server(&lower).unwrap_or(Palette::Grey)
        };
        return Verdict::Hit(Classification {
            group: lower,
            label: server.to_string(),
            palette,
        });
    }

    Verdict::Hit(Classification {
        group: OTHERS.to_string(),
        label: server.to_string(),
        palette: Palette::Grey,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(server: &str, cf_ray: Option<&str>, location: Option<&str>) -> ServerHeaders {
        ServerHeaders {
            server: server.to_string(),
            cf_ray: cf_ray.map(str::to_string),
            location: location.map(str::to_string),
        }
    }

    fn hit(verdict: Verdict) -> Classification {
        match verdict {
            Verdict::Hit(c) => c,
            Verdict::Abort => panic!("unexpected abort"),
        }
    }

    #[test]
    fn test_known_server_gets_family_color() {
        let all = ServerList::all();

        let c = hit(classify(&all, &headers("AkamaiGHost", None, None)));
        assert_eq!(c.group, "akamaighost");
        assert_eq!(c.label, "AkamaiGHost");
        assert_eq!(c.palette, Palette::Yellow);

        let c = hit(classify(&all, &headers("Tencent", None, None)));
        assert_eq!(c.group, "tencent");
        assert_eq!(c.palette, Palette::BrightMagenta);

        let c = hit(classify(&all, &headers("cloudflare", Some("8a1b-AMS"), None)));
        assert_eq!(c.group, "cloudflare");
        assert_eq!(c.label, "cloudflare");
        assert_eq!(c.palette, Palette::Green);
    }

    #[test]
    fn test_hidden_cloudflare_is_detected() {
        let all = ServerList::all();
        let c = hit(classify(&all, &headers("nginx", Some("8a1b-AMS"), None)));
        assert_eq!(c.group, "cloudflare");
        assert_eq!(c.label, "nginx (cf)");
        assert_eq!(c.palette, Palette::Green);
    }

    #[test]
    fn test_hidden_cloudflare_needs_cloudflare_on_list() {
        let list: ServerList = "nginx,apache".parse().unwrap();
        let c = hit(classify(&list, &headers("nginx", Some("8a1b-AMS"), None)));
        assert_eq!(c.group, "nginx");
        assert_eq!(c.palette, Palette::White);
    }

    #[test]
    fn test_single_entry_list_is_green() {
        let list: ServerList = "apache".parse().unwrap();
        let c = hit(classify(&list, &headers("Apache", None, None)));
        assert_eq!(c.group, "apache");
        assert_eq!(c.palette, Palette::Green);
    }

    #[test]
    fn test_custom_listed_server_is_grey() {
        let list: ServerList = "gws,nginx".parse().unwrap();
        let c = hit(classify(&list, &headers("gws", None, None)));
        assert_eq!(c.group, "gws");
        assert_eq!(c.palette, Palette::Grey);
    }

    #[test]
    fn test_unlisted_server_goes_to_others() {
        let all = ServerList::all();
        let c = hit(classify(&all, &headers("LiteSpeed", None, Some("/login"))));
        assert_eq!(c.group, OTHERS);
        assert_eq!(c.label, "LiteSpeed");
        assert_eq!(c.palette, Palette::Grey);
    }

    #[test]
    fn test_balance_exhaust_aborts() {
        let all = ServerList::all();
        let verdict = classify(&all, &headers("cloudflare", None, Some(BALANCE_EXHAUST)));
        assert_eq!(verdict, Verdict::Abort);
    }

    #[test]
    fn test_headers_are_extracted() {
        let mut map = HeaderMap::new();
        map.insert(SERVER, HeaderValue::from_static("nginx"));
        map.insert("cf-ray", HeaderValue::from_static("abc-LHR"));
        map.insert(LOCATION, HeaderValue::from_static(""));

        let h = ServerHeaders::from_headers(&map);
        assert_eq!(h, headers("nginx", Some("abc-LHR"), None));
    }
}
