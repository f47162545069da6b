use std::fmt;

/// Every machine found in one export document, in document order.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub machines: Vec<Machine>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub uuid: String,
    pub name_label: String,
    pub parents: Vec<Parent>,
    pub disks: Vec<Disk>,
    pub snapshots: Vec<Snapshot>,
}

/// Lineage link to another machine. `self_parent` marks a reference back to
/// the owning machine.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub uuid: String,
    pub self_parent: bool,
}

/// A VBD attachment.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    pub uuid: String,
    pub vbd_type: String,
    pub vdi_name_label: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub uuid: String,
    pub name_label: String,
    pub name_description: String,
    pub is_vmss_snapshot: String,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

impl Snapshot {
    /// true when the flag says the snapshot came from a scheduled snapshot
    /// policy. Unparseable flags count as false.
    pub fn is_scheduled(&self) -> bool {
        parse_bool(&self.is_vmss_snapshot).unwrap_or(false)
    }
}

/// Boolean grammar used by the exporter: 1/t/T/TRUE/true/True and the
/// matching false spellings. Surrounding whitespace is ignored.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "name: {}\nparents: {}\nvbds: {}\nsnapshots: {}",
            self.name_label,
            self.parents.len(),
            self.disks.len(),
            self.snapshots.len()
        )
    }
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "parent {}", self.uuid)?;
        if self.self_parent {
            write!(f, " (self)")?;
        }
        Ok(())
    }
}

impl fmt::Display for Disk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "vbd {} type: {} vdi: {}",
            self.uuid, self.vbd_type, self.vdi_name_label
        )
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "snapshot {} name: {}", self.uuid, self.name_label)?;
        if !self.name_description.is_empty() {
            write!(f, " description: {}", self.name_description)?;
        }
        if self.is_scheduled() {
            write!(f, " (vmss)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_spellings() {
        for s in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(s), Some(true), "{s}");
        }
        for s in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(s), Some(false), "{s}");
        }
        assert_eq!(parse_bool(" true\n"), Some(true));
        assert_eq!(parse_bool("\t0 "), Some(false));
        assert_eq!(parse_bool(""), None);
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool("tRuE"), None);
    }

    #[test]
    fn test_snapshot_is_scheduled() {
        let mut snap = Snapshot::default();
        assert!(!snap.is_scheduled());
        snap.is_vmss_snapshot = "true".to_string();
        assert!(snap.is_scheduled());
        snap.is_vmss_snapshot = "maybe".to_string();
        assert!(!snap.is_scheduled());
    }

    #[test]
    fn test_display() {
        let parent = Parent {
            uuid: "p-1".to_string(),
            self_parent: true,
        };
        assert_eq!(parent.to_string(), "parent p-1 (self)");

        let disk = Disk {
            uuid: "d-1".to_string(),
            vbd_type: "CD".to_string(),
            vdi_name_label: "install.iso".to_string(),
        };
        assert_eq!(disk.to_string(), "vbd d-1 type: CD vdi: install.iso");

        let snap = Snapshot {
            uuid: "s-1".to_string(),
            name_label: "nightly".to_string(),
            name_description: String::new(),
            is_vmss_snapshot: "True".to_string(),
        };
        assert_eq!(snap.to_string(), "snapshot s-1 name: nightly (vmss)");
    }
}
