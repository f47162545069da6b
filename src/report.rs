use std::io::{self, Write};

use crate::vms::Collection;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// one `<index> : <uuid>` line per machine
    #[default]
    Summary,
    /// summary line followed by the machine's records, indented
    Detailed,
}

pub fn report<W: Write>(vms: &Collection, out: &mut W, style: ReportStyle) -> io::Result<()> {
    for (index, vm) in vms.machines.iter().enumerate() {
        writeln!(out, "{index} : {}", vm.uuid)?;

        if style == ReportStyle::Detailed {
            for line in vm.to_string().lines() {
                writeln!(out, "    {line}")?;
            }
            for parent in &vm.parents {
                writeln!(out, "    {parent}")?;
            }
            for disk in &vm.disks {
                writeln!(out, "    {disk}")?;
            }
            for snapshot in &vm.snapshots {
                writeln!(out, "    {snapshot}")?;
            }
        }
    }
    out.flush()
}
