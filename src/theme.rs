//! Colour palettes. The selected theme lives in a cookie and is handed to the
//! page shell explicitly; nothing reads it from global state.

use super::config::THEME_COOKIE;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Pink,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::Pink];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "pink" => Some(Self::Pink),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Pink => "pink",
        }
    }

    /// `Set-Cookie` value that remembers this theme for a year.
    pub fn cookie(&self) -> String {
        format!(
            "{THEME_COOKIE}={}; Path=/; Max-Age=31536000; SameSite=Lax",
            self.as_str()
        )
    }

    pub fn palette(&self) -> Palette {
        match self {
            Self::Light => Palette {
                background: "bg-gray-50",
                card: "bg-white",
                text_primary: "text-gray-800",
                text_secondary: "text-gray-600",
                accent: "bg-pink-400 hover:bg-pink-500 text-white",
                input: "bg-white border-gray-300",
            },
            Self::Dark => Palette {
                background: "bg-slate-900",
                card: "bg-slate-800",
                text_primary: "text-white",
                text_secondary: "text-slate-300",
                accent: "bg-indigo-500 hover:bg-indigo-600 text-white",
                input: "bg-slate-700 border-slate-600 text-white",
            },
            Self::Pink => Palette {
                background: "bg-pink-50",
                card: "bg-pink-100",
                text_primary: "text-pink-900",
                text_secondary: "text-pink-700",
                accent: "bg-pink-600 hover:bg-pink-700 text-white",
                input: "bg-white border-pink-300",
            },
        }
    }
}

/// Tailwind classes for each role on the page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub card: &'static str,
    pub text_primary: &'static str,
    pub text_secondary: &'static str,
    pub accent: &'static str,
    pub input: &'static str,
}

impl Default for Palette {
    fn default() -> Self {
        Theme::default().palette()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for theme in Theme::ALL {
            assert_eq!(Theme::parse(theme.as_str()), Some(theme));
        }
        assert_eq!(Theme::parse(" DARK "), Some(Theme::Dark));
        assert_eq!(Theme::parse("neon"), None);
    }

    #[test]
    fn test_cookie() {
        assert_eq!(
            Theme::Pink.cookie(),
            "theme=pink; Path=/; Max-Age=31536000; SameSite=Lax"
        );
    }

    #[test]
    fn test_default_is_light() {
        assert_eq!(Palette::default(), Theme::Light.palette());
    }
}
