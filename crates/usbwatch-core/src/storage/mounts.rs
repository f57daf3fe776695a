// ── Mount-table and volume-descriptor grammars ──

use std::sync::LazyLock;

use regex::Regex;

use crate::platform::Platform;

/// `<source> on <target> [type <fs>] (<options>)`, as printed by `mount`
/// on Linux and macOS. Targets may contain spaces.
static MOUNT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<source>\S+) on (?P<target>.+?)(?: type \S+)? \(")
        .expect("mount line pattern is valid")
});

const LINUX_REMOVABLE_ROOTS: [&str; 3] = ["/media/", "/run/media/", "/mnt/"];

/// One candidate volume from the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Backing device node, where the platform reports one.
    pub source: Option<String>,
    pub path: String,
}

/// Command listing the current mounts.
pub fn mount_table_command(platform: Platform) -> (&'static str, Vec<String>) {
    match platform {
        Platform::Linux | Platform::MacOs => ("mount", Vec::new()),
        Platform::Windows => (
            "wmic",
            vec![
                "logicaldisk".into(),
                "where".into(),
                "drivetype=2".into(),
                "get".into(),
                "DeviceID".into(),
                "/format:csv".into(),
            ],
        ),
    }
}

/// Removable-volume candidates, in mount-table order.
pub fn parse_mount_table(platform: Platform, text: &str) -> Vec<MountPoint> {
    match platform {
        Platform::MacOs => parse_unix_mounts(text)
            .filter(|m| m.path.starts_with("/Volumes/"))
            .collect(),
        Platform::Linux => parse_unix_mounts(text)
            .filter(|m| {
                m.source.as_deref().is_some_and(|s| s.starts_with("/dev/"))
                    && LINUX_REMOVABLE_ROOTS
                        .iter()
                        .any(|root| m.path.starts_with(root))
            })
            .collect(),
        Platform::Windows => parse_removable_drives(text),
    }
}

fn parse_unix_mounts(text: &str) -> impl Iterator<Item = MountPoint> + '_ {
    text.lines().filter_map(|line| {
        let caps = MOUNT_LINE.captures(line.trim())?;
        Some(MountPoint {
            source: Some(caps["source"].to_owned()),
            path: caps["target"].to_owned(),
        })
    })
}

/// `Node,DeviceID` CSV with drive letters such as `E:`.
fn parse_removable_drives(text: &str) -> Vec<MountPoint> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .skip(1)
        .filter_map(|line| {
            let letter = line.rsplit(',').next()?.trim();
            let valid = letter.len() == 2
                && letter.ends_with(':')
                && letter.starts_with(|c: char| c.is_ascii_alphabetic());
            valid.then(|| MountPoint {
                source: None,
                path: letter.to_ascii_uppercase(),
            })
        })
        .collect()
}

/// Per-volume command whose output names the backing USB device.
pub fn descriptor_command(platform: Platform, mount: &MountPoint) -> (&'static str, Vec<String>) {
    match platform {
        Platform::MacOs => ("diskutil", vec!["info".into(), mount.path.clone()]),
        Platform::Linux => {
            let node = mount.source.clone().unwrap_or_else(|| mount.path.clone());
            (
                "udevadm",
                vec![
                    "info".into(),
                    "--query=property".into(),
                    format!("--name={node}"),
                ],
            )
        }
        Platform::Windows => {
            let letter = mount.path.trim_end_matches(':');
            let script = format!(
                "Get-Partition -DriveLetter {letter} | Get-Disk | ForEach-Object {{ \
                 (Get-PnpDeviceProperty -InstanceId (Get-PnpDevice -FriendlyName $_.FriendlyName).InstanceId \
                 -KeyName DEVPKEY_Device_Parent).Data }}"
            );
            (
                "powershell",
                vec!["-NoProfile".into(), "-Command".into(), script],
            )
        }
    }
}

/// Whether descriptor output names the given vendor/product pair.
pub fn descriptor_matches(platform: Platform, text: &str, vendor_id: u16, product_id: u16) -> bool {
    match platform {
        Platform::Windows => {
            let upper = text.to_ascii_uppercase();
            upper.contains(&format!("VID_{vendor_id:04X}"))
                && upper.contains(&format!("PID_{product_id:04X}"))
        }
        Platform::MacOs => {
            labelled_hex(text, "Vendor ID:") == Some(vendor_id)
                && labelled_hex(text, "Product ID:") == Some(product_id)
        }
        Platform::Linux => {
            property(text, "ID_VENDOR_ID").is_some_and(|v| v.eq_ignore_ascii_case(&format!("{vendor_id:04x}")))
                && property(text, "ID_MODEL_ID")
                    .is_some_and(|v| v.eq_ignore_ascii_case(&format!("{product_id:04x}")))
        }
    }
}

/// Value of `Label:  0x0951 (…)`, tolerating a space after `0x`.
fn labelled_hex(text: &str, label: &str) -> Option<u16> {
    text.lines().find_map(|line| {
        let (_, value) = line.split_once(label)?;
        let value = value.trim();
        let value = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value)
            .trim_start();
        let digits: String = value.chars().take_while(char::is_ascii_hexdigit).collect();
        u16::from_str_radix(&digits, 16).ok()
    })
}

/// `KEY=value` line from `udevadm info --query=property`.
fn property<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let (k, v) = line.trim().split_once('=')?;
        (k == key).then(|| v.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn macos_mounts_keep_only_volumes() {
        let text = "\
/dev/disk3s1s1 on / (apfs, sealed, local, read-only, journaled)
devfs on /dev (devfs, local, nobrowse)
/dev/disk4s1 on /Volumes/KINGSTON (msdos, local, nodev, nosuid, noowners)
/dev/disk5s1 on /Volumes/My Backup (hfs, local, nodev, nosuid, journaled)
";
        let mounts = parse_mount_table(Platform::MacOs, text);
        let paths: Vec<&str> = mounts.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/Volumes/KINGSTON", "/Volumes/My Backup"]);
    }

    #[test]
    fn linux_mounts_keep_removable_device_nodes() {
        let text = "\
/dev/nvme0n1p2 on / type ext4 (rw,relatime)
tmpfs on /run/media/tmp type tmpfs (rw)
/dev/sdb1 on /media/alex/KINGSTON type vfat (rw,nosuid,nodev)
/dev/sdc1 on /run/media/alex/SANDISK type exfat (rw)
";
        let mounts = parse_mount_table(Platform::Linux, text);
        assert_eq!(
            mounts,
            vec![
                MountPoint {
                    source: Some("/dev/sdb1".into()),
                    path: "/media/alex/KINGSTON".into(),
                },
                MountPoint {
                    source: Some("/dev/sdc1".into()),
                    path: "/run/media/alex/SANDISK".into(),
                },
            ]
        );
    }

    #[test]
    fn windows_drive_letters() {
        let text = "\r\nNode,DeviceID\r\nDESKTOP-1,E:\r\nDESKTOP-1,f:\r\nDESKTOP-1,\r\n";
        let paths: Vec<String> = parse_mount_table(Platform::Windows, text)
            .into_iter()
            .map(|m| m.path)
            .collect();
        assert_eq!(paths, vec!["E:", "F:"]);
    }

    #[test]
    fn macos_descriptor_matching() {
        let text = "   Device Node:  /dev/disk4s1\n   Vendor ID:  0x0951\n   Product ID: 0x1666\n";
        assert!(descriptor_matches(Platform::MacOs, text, 0x0951, 0x1666));
        assert!(!descriptor_matches(Platform::MacOs, text, 0x0951, 0x1667));
        assert!(descriptor_matches(
            Platform::MacOs,
            "Vendor ID: 0x 0951\nProduct ID: 0x 1666",
            0x0951,
            0x1666
        ));
    }

    #[test]
    fn linux_descriptor_matching() {
        let text = "DEVNAME=/dev/sdb1\nID_VENDOR_ID=0951\nID_MODEL_ID=1666\nID_BUS=usb\n";
        assert!(descriptor_matches(Platform::Linux, text, 0x0951, 0x1666));
        assert!(!descriptor_matches(Platform::Linux, text, 0x046d, 0x1666));
    }

    #[test]
    fn windows_descriptor_matching() {
        let text = "USB\\VID_0951&PID_1666\\001A4D5E1F6BEF4159A71BAB\r\n";
        assert!(descriptor_matches(Platform::Windows, text, 0x0951, 0x1666));
        assert!(!descriptor_matches(Platform::Windows, text, 0x0951, 0x0001));
    }

    #[test]
    fn descriptor_commands_target_the_mount() {
        let mount = MountPoint {
            source: Some("/dev/sdb1".into()),
            path: "/media/alex/KINGSTON".into(),
        };
        let (program, args) = descriptor_command(Platform::Linux, &mount);
        assert_eq!(program, "udevadm");
        assert_eq!(args.last().map(String::as_str), Some("--name=/dev/sdb1"));

        let (program, args) = descriptor_command(Platform::MacOs, &mount);
        assert_eq!(program, "diskutil");
        assert_eq!(args, vec!["info".to_owned(), "/media/alex/KINGSTON".to_owned()]);
    }
}
