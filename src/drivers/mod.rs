// src/drivers/mod.rs
//
// Compares the installed low-level driver set against a fixed catalog of
// expected drivers, ranking the gaps by device-category impact.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;

use crate::commands;
use crate::models::{DriverRecord, DriverStatus, Impact};

const ENUMERATION_TIMEOUT: Duration = Duration::from_secs(20);

/// Expected `(driver name, device description)` pairs. INF names are matched
/// case-insensitively against the installed set.
pub static EXPECTED_DRIVERS: &[(&str, &str)] = &[
    ("nvlddmkm", "NVIDIA GPU"),
    ("rt640x64", "Realtek NIC"),
    ("iaStorA", "Intel Storage"),
    ("usbport", "USB Controller"),
    ("hidusb", "HID Device"),
    ("kbdhid", "Keyboard"),
    ("mouhid", "Mouse"),
    ("intelppm", "CPU Driver"),
    ("disk", "Disk Controller"),
    ("storahci", "AHCI Controller"),
    ("rt73", "Wi-Fi Adapter"),
    ("bthusb", "Bluetooth USB Adapter"),
    ("audiodg", "Audio Device"),
    ("ati2mtag", "AMD GPU"),
    ("nvlddmkm_win", "NVIDIA GPU"),
    ("netwtw06", "Intel Wireless"),
    ("btfilter", "Bluetooth Filter Driver"),
    ("e1d65x64", "Intel Ethernet"),
    ("rtwlane", "Realtek Wi-Fi"),
    ("iaahcic", "Intel AHCI Controller"),
];

const CRITICAL_KEYWORDS: &[&str] = &["storage", "disk", "ahci", "cpu"];
const HIGH_KEYWORDS: &[&str] = &["nic", "wireless", "wi-fi", "ethernet", "bluetooth"];
const MEDIUM_KEYWORDS: &[&str] = &["gpu", "audio", "usb"];

impl Impact {
    pub fn score(self) -> u32 {
        match self {
            Impact::Critical => 95,
            Impact::High => 75,
            Impact::Medium => 50,
            Impact::Low => 25,
        }
    }
}

/// First matching keyword category wins; anything unmatched is Low.
pub fn classify_impact(device: &str) -> Impact {
    let name = device.to_lowercase();
    if CRITICAL_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        Impact::Critical
    } else if HIGH_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        Impact::High
    } else if MEDIUM_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        Impact::Medium
    } else {
        Impact::Low
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RiskSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Catalog entries absent from the installed set, sorted descending by risk
/// score; stable sort keeps catalog order within a score band.
pub fn missing_from_catalog(
    catalog: &[(&str, &str)],
    installed: &HashSet<String>,
) -> Vec<DriverRecord> {
    let mut missing: Vec<DriverRecord> = catalog
        .iter()
        .filter(|(name, _)| !installed.contains(&name.to_lowercase()))
        .map(|(name, device)| {
            let impact = classify_impact(device);
            DriverRecord {
                driver_name: name.to_string(),
                device: device.to_string(),
                impact,
                risk_score: impact.score(),
                status: DriverStatus::Missing,
            }
        })
        .collect();
    missing.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    missing
}

pub fn missing_drivers(installed: &HashSet<String>) -> Vec<DriverRecord> {
    missing_from_catalog(EXPECTED_DRIVERS, installed)
}

pub fn risk_summary(missing: &[DriverRecord]) -> RiskSummary {
    let mut summary = RiskSummary::default();
    for record in missing {
        match record.impact {
            Impact::Critical => summary.critical += 1,
            Impact::High => summary.high += 1,
            Impact::Medium => summary.medium += 1,
            Impact::Low => summary.low += 1,
        }
    }
    summary
}

/// Installed driver INF names, lowercased and stripped of extension. WMIC is
/// preferred (older Windows); newer hosts without it fall back to
/// `Get-CimInstance`. Both failing degrades to an empty set.
pub async fn scan_installed_drivers() -> Vec<String> {
    let mut installed: HashSet<String> = HashSet::new();

    match commands::run_with_timeout(
        "wmic",
        &["path", "win32_pnpsigneddriver", "get", "infname", "/format:csv"],
        ENUMERATION_TIMEOUT,
    )
    .await
    {
        Ok(stdout) => installed.extend(parse_wmic_csv(&stdout)),
        Err(err) => tracing::debug!(%err, "wmic driver enumeration failed"),
    }

    if installed.is_empty() {
        match commands::run_with_timeout(
            "powershell",
            &[
                "-NoProfile",
                "-Command",
                "Get-CimInstance Win32_PnPSignedDriver | Select-Object -ExpandProperty InfName",
            ],
            ENUMERATION_TIMEOUT,
        )
        .await
        {
            Ok(stdout) => installed.extend(parse_inf_lines(&stdout)),
            Err(err) => tracing::debug!(%err, "powershell driver enumeration failed"),
        }
    }

    let mut names: Vec<String> = installed.into_iter().collect();
    names.sort();
    names
}

fn strip_inf_extension(inf_name: &str) -> &str {
    inf_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(inf_name)
}

pub(crate) fn parse_wmic_csv(stdout: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.to_lowercase().starts_with("node,") {
            continue;
        }
        let Some(inf_name) = line.split(',').next_back() else {
            continue;
        };
        let inf_name = inf_name.trim().trim_matches('"');
        if inf_name.is_empty() || inf_name.eq_ignore_ascii_case("infname") {
            continue;
        }
        names.push(strip_inf_extension(inf_name).to_lowercase());
    }
    names
}

pub(crate) fn parse_inf_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim().trim_matches('"'))
        .filter(|line| !line.is_empty())
        .map(|inf| strip_inf_extension(inf).to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ahci_device_is_critical_95() {
        let installed: HashSet<String> = ["disk".to_string()].into_iter().collect();
        let catalog = [("disk", "Disk Controller"), ("storahci", "AHCI Controller")];
        let missing = missing_from_catalog(&catalog, &installed);

        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].driver_name, "storahci");
        assert_eq!(missing[0].impact, Impact::Critical);
        assert_eq!(missing[0].risk_score, 95);
        assert_eq!(missing[0].status, DriverStatus::Missing);
    }

    #[test]
    fn keyword_table_covers_every_band() {
        assert_eq!(classify_impact("Intel Storage"), Impact::Critical);
        assert_eq!(classify_impact("CPU Driver"), Impact::Critical);
        assert_eq!(classify_impact("Realtek NIC"), Impact::High);
        assert_eq!(classify_impact("Bluetooth Filter Driver"), Impact::High);
        assert_eq!(classify_impact("NVIDIA GPU"), Impact::Medium);
        assert_eq!(classify_impact("Audio Device"), Impact::Medium);
        assert_eq!(classify_impact("Keyboard"), Impact::Low);
    }

    #[test]
    fn missing_list_is_sorted_by_descending_score() {
        let installed = HashSet::new();
        let missing = missing_drivers(&installed);
        assert_eq!(missing.len(), EXPECTED_DRIVERS.len());
        assert!(missing.windows(2).all(|w| w[0].risk_score >= w[1].risk_score));
    }

    #[test]
    fn summary_counts_each_band() {
        let missing = missing_drivers(&HashSet::new());
        let summary = risk_summary(&missing);
        assert_eq!(
            summary,
            RiskSummary {
                critical: 5,
                high: 7,
                medium: 5,
                low: 3,
            }
        );
    }

    #[test]
    fn installed_names_match_case_insensitively() {
        // The catalog stores iaStorA with mixed case; installed sets are
        // lowercased by the scanners.
        let installed: HashSet<String> = ["iastora".to_string()].into_iter().collect();
        let missing = missing_drivers(&installed);
        assert!(missing.iter().all(|m| m.driver_name != "iaStorA"));
    }

    #[test]
    fn wmic_csv_rows_reduce_to_inf_stems() {
        let stdout = "Node,InfName\r\nHOST-1,oem12.inf\r\nHOST-1,\"disk.inf\"\r\n\r\n";
        let names = parse_wmic_csv(stdout);
        assert_eq!(names, vec!["oem12".to_string(), "disk".to_string()]);
    }

    #[test]
    fn inf_lines_reduce_to_stems() {
        let stdout = "machine.inf\r\n\"storahci.inf\"\r\n\r\n";
        assert_eq!(
            parse_inf_lines(stdout),
            vec!["machine".to_string(), "storahci".to_string()]
        );
    }
}
