use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use roxmltree::{Document, Node, ParsingOptions};
use thiserror::Error;
use tracing::{debug, warn};

use crate::vms::{parse_bool, Collection, Disk, Machine, Parent, Snapshot};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("export is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("malformed xml")]
    Xml(#[from] roxmltree::Error),
    #[error("expected root element <vms>, found <{0}>")]
    UnexpectedRoot(String),
    #[error("<{element}> has no {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("{attribute}=\"{value}\" is not a boolean")]
    InvalidBool {
        attribute: &'static str,
        value: String,
    },
}

/// How schema problems are treated. Permissive matches what existing export
/// readers accept: problems fall back to empty values instead of failing.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    Permissive,
    Strict,
}

/// Reads a whole export file. Failing to read the file is an error in every
/// mode.
pub fn load(path: &Path, mode: ParseMode) -> Result<Collection, ImportError> {
    let bytes = fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read export");

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) if mode == ParseMode::Strict => return Err(e.into()),
        Err(e) => {
            warn!("export is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    parse(&text, mode)
}

pub fn parse(text: &str, mode: ParseMode) -> Result<Collection, ImportError> {
    let doc = match parse_document(text) {
        Ok(doc) => doc,
        Err(e) if mode == ParseMode::Strict => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "malformed export, keeping the machines read before the error");
            return Ok(salvage(text));
        }
    };

    let collection = collect(&doc, mode)?;
    debug!(machines = collection.len(), "parsed export");

    Ok(collection)
}

fn parse_document(text: &str) -> Result<Document<'_>, roxmltree::Error> {
    let opt = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, opt)
}

fn collect(doc: &Document, mode: ParseMode) -> Result<Collection, ImportError> {
    let root = doc.root_element();
    if root.tag_name().name() != "vms" {
        let err = ImportError::UnexpectedRoot(root.tag_name().name().to_string());
        return match mode {
            ParseMode::Strict => Err(err),
            ParseMode::Permissive => {
                warn!(error = %err, "ignoring export content");
                Ok(Collection::default())
            }
        };
    }

    let mut collection = Collection::default();
    for node in elements(root, "vm") {
        collection.machines.push(load_machine(node, mode)?);
    }
    Ok(collection)
}

/* longest prefix that ends after a complete top-level <vm>, closed off and read again */
fn salvage(text: &str) -> Collection {
    let Some((root, ends)) = vm_boundaries(text) else {
        return Collection::default();
    };

    for &end in ends.iter().rev() {
        let closed = format!("{}</{root}>", &text[..end]);
        if let Ok(doc) = parse_document(&closed) {
            let vms = collect(&doc, ParseMode::Permissive).unwrap_or_default();
            debug!(machines = vms.len(), bytes = end, "salvaged export prefix");
            return vms;
        }
    }
    Collection::default()
}

/// Root element name and the byte offsets just past each complete `<vm>`
/// directly under it, up to the first syntax error.
fn vm_boundaries(text: &str) -> Option<(String, Vec<usize>)> {
    let mut reader = Reader::from_str(text);
    let mut root = None;
    let mut ends = Vec::new();
    let mut depth = 0_usize;

    loop {
        let at_vm_end = match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    root = Some(String::from_utf8_lossy(e.name().into_inner()).into_owned());
                }
                depth += 1;
                false
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                depth == 1 && e.local_name().into_inner() == b"vm"
            }
            Ok(Event::Empty(e)) => depth == 1 && e.local_name().into_inner() == b"vm",
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => false,
        };

        if at_vm_end {
            match usize::try_from(reader.buffer_position()) {
                Ok(pos) => ends.push(pos),
                Err(_) => break,
            }
        }
    }

    root.map(|root| (root, ends))
}

fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/* children of every <wrapper> under node, concatenated in document order */
fn nested<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    wrapper: &'static str,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    elements(node, wrapper).flat_map(move |w| elements(w, name))
}

fn load_machine(node: Node, mode: ParseMode) -> Result<Machine, ImportError> {
    let mut machine = Machine {
        uuid: required(node, "vm", "uuid", mode)?,
        name_label: optional(node, "name"),
        ..Machine::default()
    };

    for n in nested(node, "parents", "parent") {
        machine.parents.push(Parent {
            uuid: required(n, "parent", "uuid", mode)?,
            self_parent: flag(n, "selfparent", mode)?,
        });
    }

    for n in nested(node, "vbds", "vbd") {
        machine.disks.push(Disk {
            uuid: required(n, "vbd", "uuid", mode)?,
            vbd_type: optional(n, "type"),
            vdi_name_label: optional(n, "vdi-name-label"),
        });
    }

    for n in nested(node, "snapshots", "snapshot") {
        machine.snapshots.push(load_snapshot(n, mode)?);
    }

    Ok(machine)
}

// Older exports carry snapshot fields as child elements rather than
// attributes, so both are accepted.
fn load_snapshot(node: Node, mode: ParseMode) -> Result<Snapshot, ImportError> {
    let field = |name| attribute_or_child(node, name);

    let uuid = match field("uuid") {
        Some(uuid) => uuid,
        None if mode == ParseMode::Strict => {
            return Err(ImportError::MissingAttribute {
                element: "snapshot",
                attribute: "uuid",
            })
        }
        None => String::new(),
    };

    Ok(Snapshot {
        uuid,
        name_label: field("name-lable").unwrap_or_default(),
        name_description: field("name-description").unwrap_or_default(),
        is_vmss_snapshot: field("is-vmss-snapshot").unwrap_or_default(),
    })
}

fn attribute_or_child(node: Node, name: &str) -> Option<String> {
    if let Some(value) = node.attribute(name) {
        return Some(value.to_string());
    }
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .map(|n| n.text().unwrap_or_default().to_string())
}

fn optional(node: Node, attribute: &str) -> String {
    node.attribute(attribute).unwrap_or_default().to_string()
}

fn required(
    node: Node,
    element: &'static str,
    attribute: &'static str,
    mode: ParseMode,
) -> Result<String, ImportError> {
    match node.attribute(attribute) {
        Some(value) => Ok(value.to_string()),
        None if mode == ParseMode::Strict => {
            Err(ImportError::MissingAttribute { element, attribute })
        }
        None => Ok(String::new()),
    }
}

fn flag(node: Node, attribute: &'static str, mode: ParseMode) -> Result<bool, ImportError> {
    let Some(value) = node.attribute(attribute) else {
        return Ok(false);
    };
    match parse_bool(value) {
        Some(b) => Ok(b),
        None if mode == ParseMode::Strict => Err(ImportError::InvalidBool {
            attribute,
            value: value.to_string(),
        }),
        None => Ok(false),
    }
}
