//! Statistics panel.

use serde::Serialize;
use std::fmt;

use crate::models::AnalysisStats;

/// Qualitative styling of the average-health figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthBand {
    Critical,
    Warning,
    Healthy,
}

impl HealthBand {
    /// `< 50` critical, `50..70` warning, `>= 70` healthy.
    pub fn from_percent(percent: u32) -> Self {
        match percent {
            p if p < 50 => Self::Critical,
            p if p < 70 => Self::Warning,
            _ => Self::Healthy,
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Healthy => "healthy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub avg_health_percent: u32,
    pub band: HealthBand,
    pub total_zones: usize,
    pub healthy_count: usize,
    pub moderate_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    pub summary: String,
}

pub fn render_stats(stats: &AnalysisStats) -> StatsView {
    let avg_health_percent = (stats.avg_health.clamp(0.0, 1.0) * 100.0).round() as u32;
    let band = HealthBand::from_percent(avg_health_percent);

    let overview = format!(
        "Average crop health is {avg_health_percent}% across {} zones.",
        stats.total_zones
    );
    let summary = if stats.critical_count > 0 {
        let zones = if stats.critical_count == 1 {
            "zone needs"
        } else {
            "zones need"
        };
        format!(
            "{overview} Warning: {} critical {zones} immediate attention.",
            stats.critical_count
        )
    } else {
        format!("{overview} No critical zones detected.")
    };

    StatsView {
        avg_health_percent,
        band,
        total_zones: stats.total_zones,
        healthy_count: stats.healthy_count,
        moderate_count: stats.moderate_count,
        warning_count: stats.warning_count,
        critical_count: stats.critical_count,
        summary,
    }
}

impl fmt::Display for StatsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Average health: {}% [{}]",
            self.avg_health_percent,
            self.band.class_name()
        )?;
        writeln!(f, "  healthy:  {}", self.healthy_count)?;
        writeln!(f, "  moderate: {}", self.moderate_count)?;
        writeln!(f, "  warning:  {}", self.warning_count)?;
        writeln!(f, "  critical: {}", self.critical_count)?;
        write!(f, "{}", self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(avg_health: f64, critical_count: usize) -> AnalysisStats {
        AnalysisStats {
            total_zones: 9 + critical_count,
            healthy_count: 6,
            warning_count: 2,
            moderate_count: 1,
            critical_count,
            avg_health,
        }
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(HealthBand::from_percent(0), HealthBand::Critical);
        assert_eq!(HealthBand::from_percent(49), HealthBand::Critical);
        assert_eq!(HealthBand::from_percent(50), HealthBand::Warning);
        assert_eq!(HealthBand::from_percent(69), HealthBand::Warning);
        assert_eq!(HealthBand::from_percent(70), HealthBand::Healthy);
        assert_eq!(HealthBand::from_percent(100), HealthBand::Healthy);
    }

    #[test]
    fn test_ten_zone_panel_with_one_critical() {
        let view = render_stats(&stats(0.724, 1));
        assert_eq!(view.avg_health_percent, 72);
        assert_eq!(view.band, HealthBand::Healthy);
        assert_eq!(view.total_zones, 10);
        assert_eq!(
            (view.healthy_count, view.warning_count, view.moderate_count, view.critical_count),
            (6, 2, 1, 1)
        );
        assert_eq!(
            view.summary,
            "Average crop health is 72% across 10 zones. Warning: 1 critical zone needs immediate attention."
        );
    }

    #[test]
    fn test_rounding_selects_band() {
        assert_eq!(render_stats(&stats(0.696, 1)).band, HealthBand::Healthy);
        assert_eq!(render_stats(&stats(0.694, 1)).band, HealthBand::Warning);
        assert_eq!(render_stats(&stats(0.496, 1)).avg_health_percent, 50);
        assert_eq!(render_stats(&stats(0.3, 1)).band, HealthBand::Critical);
    }

    #[test]
    fn test_summary_without_critical_zones() {
        let view = render_stats(&stats(0.8, 0));
        assert!(view.summary.ends_with("No critical zones detected."));
        assert!(!view.summary.contains("Warning"));
    }

    #[test]
    fn test_panel_text() {
        let text = render_stats(&stats(0.45, 2)).to_string();
        assert!(text.starts_with("Average health: 45% [critical]"));
        assert!(text.contains("  critical: 2"));
        assert!(text.ends_with("2 critical zones need immediate attention."));
    }
}
