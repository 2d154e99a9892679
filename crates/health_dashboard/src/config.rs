use crate::format::NumberLocale;

pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug)]
pub struct DashboardConfig {
    pub locale: NumberLocale,
    pub log_filter: String,
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// `HEALTH_DASHBOARD_LOCALE` wins over `LANG`; `HEALTH_DASHBOARD_LOG_LEVEL`
    /// wins over `RUST_LOG`. Empty values count as unset.
    pub fn from_env_with<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut first = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| get(*k).filter(|v| !v.trim().is_empty()))
        };
        let locale = first(&["HEALTH_DASHBOARD_LOCALE", "LANG"])
            .map(|tag| NumberLocale::for_tag(&tag))
            .unwrap_or_default();
        let log_filter = first(&["HEALTH_DASHBOARD_LOG_LEVEL", "RUST_LOG"])
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.into());
        Self { locale, log_filter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_env_is_empty() {
        let cfg = DashboardConfig::from_env_with(|_| None);
        assert_eq!(cfg.locale, NumberLocale::default());
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn dashboard_locale_takes_priority_over_lang() {
        let cfg = DashboardConfig::from_env_with(|k| match k {
            "HEALTH_DASHBOARD_LOCALE" => Some("de_DE".into()),
            "LANG" => Some("en_US.UTF-8".into()),
            _ => None,
        });
        assert_eq!(cfg.locale.grouping_separator(), ".");
    }

    #[test]
    fn lang_is_used_as_fallback() {
        let cfg = DashboardConfig::from_env_with(|k| match k {
            "LANG" => Some("fr_FR.UTF-8".into()),
            "RUST_LOG" => Some("debug".into()),
            _ => None,
        });
        assert_eq!(cfg.locale.tag(), "fr_FR");
        assert_eq!(cfg.log_filter, "debug");
    }

    #[test]
    fn blank_log_level_falls_through() {
        let cfg = DashboardConfig::from_env_with(|k| match k {
            "HEALTH_DASHBOARD_LOG_LEVEL" => Some("  ".into()),
            "RUST_LOG" => Some("warn".into()),
            _ => None,
        });
        assert_eq!(cfg.log_filter, "warn");
    }
}
