//! Output and reporting for loaded providers.

use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::model::{BouquetConfig, Provider, TableIds};
use crate::repository::{LoadOrigin, LoadReport};

/// Formatter for load reports
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_report(
        &self,
        report: &LoadReport,
        format: OutputFormat,
        elapsed: Duration,
    ) -> serde_json::Result<String> {
        match format {
            OutputFormat::Human => Ok(self.format_human(report, elapsed)),
            OutputFormat::Json => serde_json::to_string_pretty(&report.providers),
            OutputFormat::Summary => Ok(self.format_summary(report, elapsed)),
        }
    }

    /// One provider as pretty JSON
    pub fn format_provider(&self, provider: &Provider) -> serde_json::Result<String> {
        serde_json::to_string_pretty(provider)
    }

    fn format_human(&self, report: &LoadReport, elapsed: Duration) -> String {
        let mut output = String::new();

        if self.verbosity == VerbosityLevel::Quiet {
            if !report.rejected.is_empty() {
                output.push_str(&format!("Rejected: {}\n", report.rejected.len()));
            }
            return output;
        }

        for provider in report.providers.values() {
            output.push_str(&self.format_provider_line(provider));
            output.push('\n');

            if self.verbosity >= VerbosityLevel::Verbose {
                output.push_str(&format!(
                    "    {}\n",
                    describe_tables(provider.transponder.tables())
                ));
                for bouquet in provider.bouquets.values() {
                    output.push_str(&format!("    {}\n", describe_bouquet(bouquet)));
                }
                if !provider.dependent.is_empty() {
                    output.push_str(&format!("    depends on {}\n", provider.dependent));
                }
            }
        }

        if self.verbosity >= VerbosityLevel::Verbose {
            for error in &report.rejected {
                output.push_str(&format!("{}  {}\n", self.colorize("✗ REJECTED", "31"), error));
            }
            for (path, issue) in &report.issues {
                output.push_str(&format!(
                    "{}  {}: {}\n",
                    self.colorize("⚠ ISSUE", "33"),
                    path.display(),
                    issue
                ));
            }
        }

        output.push('\n');
        output.push_str(&self.format_summary(report, elapsed));
        output
    }

    fn format_provider_line(&self, provider: &Provider) -> String {
        format!(
            "{}  {} [{}, {}] {} bouquet{}",
            self.colorize(&provider.key, "32"),
            provider.name,
            provider.protocol,
            provider.transponder.delivery_system(),
            provider.bouquets.len(),
            if provider.bouquets.len() == 1 { "" } else { "s" }
        )
    }

    fn format_summary(&self, report: &LoadReport, elapsed: Duration) -> String {
        let mut output = String::new();
        output.push_str("Provider Summary:\n");
        output.push_str(&format!("  Definition files: {}\n", report.files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Providers:", "32"),
            report.providers.len()
        ));
        if !report.rejected.is_empty() {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Rejected:", "31"),
                report.rejected.len()
            ));
        }
        if !report.issues.is_empty() {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Field issues:", "33"),
                report.issues.len()
            ));
        }

        let origin = match report.origin {
            LoadOrigin::Cache => "cache",
            LoadOrigin::Rebuilt => "definitions",
        };
        output.push_str(&format!("  Loaded from: {}\n", origin));
        output.push_str(&format!("  Duration: {}\n", format_duration(elapsed)));
        output
    }
}

fn describe_tables(tables: &TableIds) -> String {
    format!(
        "NIT 0x{:x} (0x{:x}/0x{:x}), SDT 0x{:x} (0x{:x}/0x{:x}), BAT 0x{:x} (0x{:x})",
        tables.nit_pid,
        tables.nit_current_table_id,
        tables.nit_other_table_id,
        tables.sdt_pid,
        tables.sdt_current_table_id,
        tables.sdt_other_table_id,
        tables.bat_pid,
        tables.bat_table_id
    )
}

fn describe_bouquet(bouquet: &BouquetConfig) -> String {
    match bouquet {
        BouquetConfig::Satellite(config) => format!(
            "{}: {} (bouquet 0x{:x}, region 0x{:x})",
            config.key, config.name, config.bouquet, config.region
        ),
        BouquetConfig::Cable(config) => format!(
            "{}: {} ({} kHz, netid {})",
            config.key, config.name, config.frequency, config.netid
        ),
        BouquetConfig::Terrestrial(config) => {
            format!("{}: {} ({} Hz)", config.key, config.name, config.frequency)
        }
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
