// src/remediation.rs
//
// Renders the PowerShell remediation script offered for download: winget
// upgrades for the applications we have a safe mapping for, Windows Update
// driver directives, and manual-review comments for everything else.

/// Display-name substrings mapped to exact winget package identifiers.
static WINGET_IDS: &[(&str, &str)] = &[
    ("node.js", "OpenJS.NodeJS"),
    ("python", "Python.Python.3"),
    ("java", "Oracle.JDK.21"),
    ("google chrome", "Google.Chrome"),
    ("github desktop", "GitHub.GitHubDesktop"),
    ("git", "Git.Git"),
    ("dropbox", "Dropbox.Dropbox"),
    ("dbeaver", "DBeaver.DBeaver"),
    ("epic games launcher", "EpicGames.EpicGamesLauncher"),
];

pub fn guess_winget_id(app_name: &str) -> Option<&'static str> {
    let name = app_name.to_lowercase();
    WINGET_IDS
        .iter()
        .find(|(key, _)| name.contains(key))
        .map(|(_, id)| *id)
}

pub fn render_script(apps: &[String], drivers: &[String], generated_at: &str) -> String {
    let mut lines: Vec<String> = vec![
        "# System Revamp - Remediation Script".to_string(),
        format!("# Generated: {}", generated_at),
        "Set-StrictMode -Version Latest".to_string(),
        "$ErrorActionPreference = 'Continue'".to_string(),
        String::new(),
        "Write-Host 'Starting safe remediation steps...' -ForegroundColor Cyan".to_string(),
        String::new(),
        "# ----- Application Updates (winget) -----".to_string(),
    ];

    if apps.is_empty() {
        lines.push("# No applications selected.".to_string());
        lines.push(String::new());
    } else {
        for name in apps {
            match guess_winget_id(name) {
                Some(winget_id) => {
                    lines.push(format!(
                        "Write-Host 'Updating {} ({})' -ForegroundColor Yellow",
                        name, winget_id
                    ));
                    lines.push(format!(
                        "winget upgrade --id \"{}\" --exact --accept-package-agreements \
                         --accept-source-agreements --disable-interactivity",
                        winget_id
                    ));
                    lines.push(String::new());
                }
                None => {
                    lines.push(format!("# No safe winget mapping found for: {}", name));
                    lines.push(format!("# Review manually: winget search --name \"{}\"", name));
                    lines.push(String::new());
                }
            }
        }
    }

    lines.extend([
        "# ----- Driver Remediation Guidance -----".to_string(),
        "Write-Host 'Checking Windows Update for driver updates...' -ForegroundColor Yellow"
            .to_string(),
        "UsoClient StartScan".to_string(),
        "UsoClient StartDownload".to_string(),
        "UsoClient StartInstall".to_string(),
        String::new(),
    ]);

    if drivers.is_empty() {
        lines.push("# No drivers selected.".to_string());
    } else {
        for driver in drivers {
            lines.push(format!(
                "# Validate/install driver manually if still missing: {}.sys",
                driver
            ));
        }
    }

    lines.push(String::new());
    lines.push("Write-Host 'Remediation script completed.' -ForegroundColor Green".to_string());

    lines.join("\n")
}
