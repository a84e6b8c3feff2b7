//! Host OS classification.
//!
//! Reads the os-release descriptor and maps it onto one of a small set of
//! families, each tied to a package-manager strategy. Derivatives (Mint,
//! Pop!_OS, Rocky) are also mapped onto the upstream distribution whose
//! third-party repositories they can consume.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

const DEBIAN_MARKERS: &[&str] = &["ubuntu", "debian", "linux mint", "pop!_os", "elementary"];
const RHEL_MARKERS: &[&str] = &[
    "centos",
    "red hat",
    "rhel",
    "fedora",
    "rocky",
    "almalinux",
    "oracle linux",
];
const DARWIN_MARKERS: &[&str] = &["darwin", "macos", "mac os"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    DebianLike,
    RhelLike,
    DarwinLike,
    Unsupported,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::DebianLike => "debian-like",
            OsFamily::RhelLike => "rhel-like",
            OsFamily::DarwinLike => "darwin-like",
            OsFamily::Unsupported => "unsupported",
        }
    }

    /// Classify a free-form host identifier by substring match.
    pub fn classify(identifier: &str) -> OsFamily {
        let lower = identifier.to_lowercase();
        let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
        if has(DEBIAN_MARKERS) {
            OsFamily::DebianLike
        } else if has(RHEL_MARKERS) {
            OsFamily::RhelLike
        } else if has(DARWIN_MARKERS) {
            OsFamily::DarwinLike
        } else {
            OsFamily::Unsupported
        }
    }

    pub fn package_manager(&self) -> PackageManager {
        match self {
            OsFamily::DebianLike => PackageManager::Apt,
            OsFamily::RhelLike => PackageManager::Dnf,
            OsFamily::DarwinLike => PackageManager::Homebrew,
            OsFamily::Unsupported => PackageManager::None,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Homebrew,
    None,
}

/// Resolved once per run; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsProfile {
    pub family: OsFamily,
    pub package_manager: PackageManager,
    /// Human-readable host name, e.g. "Ubuntu 22.04.4 LTS".
    pub description: String,
    /// Upstream distribution id used in vendor repository URLs
    /// (`ubuntu`, `debian`, `fedora`, `rhel`, `centos`).
    pub distro_id: String,
    /// Upstream release codename, when the descriptor names one.
    pub codename: Option<String>,
    /// Architecture in Debian/Kubernetes naming (`amd64`, `arm64`).
    pub arch: String,
}

impl OsProfile {
    pub fn from_family(family: OsFamily, description: impl Into<String>) -> Self {
        let description = description.into();
        let distro_id = upstream_distro(family, &description.to_lowercase());
        Self {
            family,
            package_manager: family.package_manager(),
            description,
            distro_id,
            codename: None,
            arch: host_arch().to_string(),
        }
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Detect the profile of the running host.
    pub fn detect() -> Result<Self> {
        if cfg!(target_os = "macos") {
            return Ok(Self::from_family(OsFamily::DarwinLike, "macOS"));
        }
        for path in OS_RELEASE_PATHS {
            let path = Path::new(path);
            if path.exists() {
                return Self::from_os_release_path(path);
            }
        }
        Err(Error::UnresolvedOs(format!(
            "none of {} exist",
            OS_RELEASE_PATHS.join(", ")
        )))
    }

    pub fn from_os_release_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::UnresolvedOs(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_os_release(&content)
    }

    /// Classify from os-release content.
    ///
    /// PRETTY_NAME, NAME, ID and ID_LIKE are all considered, so derivatives
    /// that only declare their parent in ID_LIKE still classify.
    pub fn from_os_release(content: &str) -> Result<Self> {
        let vars = parse_os_release(content);
        let identifier: Vec<&str> = ["PRETTY_NAME", "NAME", "ID", "ID_LIKE"]
            .iter()
            .filter_map(|key| vars.get(*key).map(String::as_str))
            .filter(|v| !v.is_empty())
            .collect();

        if identifier.is_empty() {
            return Err(Error::UnresolvedOs(
                "os-release has no NAME, PRETTY_NAME or ID".to_string(),
            ));
        }

        let family = OsFamily::classify(&identifier.join(" "));
        let description = vars
            .get("PRETTY_NAME")
            .or_else(|| vars.get("NAME"))
            .or_else(|| vars.get("ID"))
            .cloned()
            .unwrap_or_default();

        if family == OsFamily::Unsupported {
            tracing::warn!("Unrecognized host '{}': automatic installs disabled", description);
        }

        let ids = ["ID", "ID_LIKE"]
            .iter()
            .filter_map(|key| vars.get(*key).map(|v| v.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ");
        let distro_id = upstream_distro(family, &ids);
        let own_id = vars.get("ID").map(|id| id.to_lowercase());
        // A derivative's VERSION_CODENAME is its own (Mint "virginia"), not
        // its upstream's, so it is only trusted when ID is the upstream.
        let codename = vars
            .get("UBUNTU_CODENAME")
            .or_else(|| vars.get("DEBIAN_CODENAME"))
            .or_else(|| {
                vars.get("VERSION_CODENAME")
                    .filter(|_| own_id.as_deref() == Some(distro_id.as_str()))
            })
            .filter(|c| !c.is_empty())
            .cloned();

        let mut profile = Self::from_family(family, description);
        profile.distro_id = distro_id;
        profile.codename = codename;
        Ok(profile)
    }
}

/// Map ids (ID first, then ID_LIKE, lowercase) onto the upstream whose
/// vendor repositories the host can use.
fn upstream_distro(family: OsFamily, ids: &str) -> String {
    let own = ids.split_whitespace().next().unwrap_or_default();
    let upstream = match family {
        OsFamily::DebianLike if ids.contains("ubuntu") || ids.contains("pop!_os") => "ubuntu",
        OsFamily::DebianLike => "debian",
        OsFamily::RhelLike if own == "fedora" => "fedora",
        OsFamily::RhelLike if own == "rhel" || ids.starts_with("red hat") => "rhel",
        OsFamily::RhelLike => "centos",
        OsFamily::DarwinLike => "macos",
        OsFamily::Unsupported => "unknown",
    };
    upstream.to_string()
}

/// Architecture of this build in the naming release downloads use.
fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Parse os-release into key-value map.
fn parse_os_release(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            vars.insert(key.trim().to_string(), value.to_string());
        }
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_identifiers() {
        assert_eq!(OsFamily::classify("Ubuntu 22.04"), OsFamily::DebianLike);
        assert_eq!(OsFamily::classify("Debian GNU/Linux 12"), OsFamily::DebianLike);
        assert_eq!(OsFamily::classify("CentOS Stream"), OsFamily::RhelLike);
        assert_eq!(
            OsFamily::classify("Red Hat Enterprise Linux 9"),
            OsFamily::RhelLike
        );
        assert_eq!(OsFamily::classify("Fedora Linux 40"), OsFamily::RhelLike);
        assert_eq!(OsFamily::classify("Arch Linux"), OsFamily::Unsupported);
    }

    #[test]
    fn parses_ubuntu_os_release() {
        let content = r#"
PRETTY_NAME="Ubuntu 22.04.4 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
ID_LIKE=debian
"#;
        let profile = OsProfile::from_os_release(content).unwrap();
        assert_eq!(profile.family, OsFamily::DebianLike);
        assert_eq!(profile.package_manager, PackageManager::Apt);
        assert_eq!(profile.description, "Ubuntu 22.04.4 LTS");
        assert_eq!(profile.distro_id, "ubuntu");
    }

    #[test]
    fn mint_resolves_to_its_ubuntu_base() {
        let content = r#"
NAME="Linux Mint"
VERSION="21.3 (Virginia)"
ID=linuxmint
ID_LIKE="ubuntu debian"
PRETTY_NAME="Linux Mint 21.3"
VERSION_CODENAME=virginia
UBUNTU_CODENAME=jammy
"#;
        let profile = OsProfile::from_os_release(content).unwrap();
        assert_eq!(profile.family, OsFamily::DebianLike);
        assert_eq!(profile.distro_id, "ubuntu");
        assert_eq!(profile.codename.as_deref(), Some("jammy"));
    }

    #[test]
    fn debian_keeps_its_own_codename() {
        let content = "PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\nID=debian\nVERSION_CODENAME=bookworm\n";
        let profile = OsProfile::from_os_release(content).unwrap();
        assert_eq!(profile.distro_id, "debian");
        assert_eq!(profile.codename.as_deref(), Some("bookworm"));

        let derivative = "NAME=\"Kali\"\nID=kali\nID_LIKE=debian\nVERSION_CODENAME=kali-rolling\n";
        let profile = OsProfile::from_os_release(derivative).unwrap();
        assert_eq!(profile.family, OsFamily::DebianLike);
        assert_eq!(profile.distro_id, "debian");
        assert_eq!(profile.codename, None);
    }

    #[test]
    fn fedora_and_rhel_rebuilds_pick_matching_repositories() {
        let fedora = OsProfile::from_os_release("NAME=\"Fedora Linux\"\nID=fedora\n").unwrap();
        assert_eq!(fedora.distro_id, "fedora");
        let rhel = OsProfile::from_os_release("NAME=\"Red Hat Enterprise Linux\"\nID=\"rhel\"\nID_LIKE=\"fedora\"\n").unwrap();
        assert_eq!(rhel.distro_id, "rhel");
        let alma = OsProfile::from_os_release("NAME=\"AlmaLinux\"\nID=\"almalinux\"\nID_LIKE=\"rhel centos fedora\"\n").unwrap();
        assert_eq!(alma.distro_id, "centos");
    }

    #[test]
    fn derivative_classified_through_id_like() {
        let content = "NAME=\"Rocky\"\nID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n";
        let profile = OsProfile::from_os_release(content).unwrap();
        assert_eq!(profile.family, OsFamily::RhelLike);
        assert_eq!(profile.package_manager, PackageManager::Dnf);
        assert_eq!(profile.distro_id, "centos");
    }

    #[test]
    fn unrecognized_host_is_unsupported() {
        let profile = OsProfile::from_os_release("NAME=\"Gentoo\"\nID=gentoo\n").unwrap();
        assert_eq!(profile.family, OsFamily::Unsupported);
        assert_eq!(profile.package_manager, PackageManager::None);
    }

    #[test]
    fn empty_descriptor_is_unresolved() {
        assert!(matches!(
            OsProfile::from_os_release("# nothing here\nVERSION_ID=1\n"),
            Err(Error::UnresolvedOs(_))
        ));
    }

    #[test]
    fn missing_file_is_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let err = OsProfile::from_os_release_path(&dir.path().join("os-release")).unwrap_err();
        assert!(matches!(err, Error::UnresolvedOs(_)));
    }
}
