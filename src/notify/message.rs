//! Alert text for a new vuln

use crate::store::Vuln;

/// Render the alert posted for a new vuln:
///
/// ```text
/// [HIGH]
/// Program: tesla
/// Hosts: [ www.tesla.com 93.184.216.34 ]
/// Description: reflected xss in search
/// ```
pub fn format_alert(vuln: &Vuln) -> String {
    let hosts: Vec<&str> = vuln
        .subdomains
        .iter()
        .chain(vuln.ips.iter())
        .map(String::as_str)
        .collect();

    format!(
        "[{}]\nProgram: {}\nHosts: [ {} ]\nDescription: {}",
        vuln.severity.as_str().to_uppercase(),
        vuln.program_id,
        hosts.join(" "),
        vuln.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Severity;

    fn vuln(subdomains: &[&str], ips: &[&str]) -> Vuln {
        Vuln {
            id: 1,
            description: "exposed .git".into(),
            severity: Severity::Critical,
            program_id: "tesla".into(),
            subdomains: subdomains.iter().map(|s| s.to_string()).collect(),
            ips: ips.iter().map(|s| s.to_string()).collect(),
            created_at: 0,
        }
    }

    #[test]
    fn test_subdomains_then_ips() {
        let text = format_alert(&vuln(&["www.tesla.com", "api.tesla.com"], &["1.2.3.4"]));
        assert_eq!(
            text,
            "[CRITICAL]\nProgram: tesla\nHosts: [ www.tesla.com api.tesla.com 1.2.3.4 ]\nDescription: exposed .git"
        );
    }

    #[test]
    fn test_no_hosts() {
        let text = format_alert(&vuln(&[], &[]));
        assert!(text.contains("Hosts: [  ]"));
    }
}
