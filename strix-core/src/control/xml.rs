//! Reply envelope parsing.
//!
//! Every control-plane reply is an XML document whose top element is
//! `<root status_code=".." status_message="..">`. A status of `200` is
//! success; anything else is a [`ControlPlaneError`] carrying that exact
//! code and message.

use roxmltree::{Document, Node};

use crate::control::server_info::{AppDescriptor, DisplayMode};
use crate::error::{ControlPlaneError, StrixError, TransportError};

/// Status code the host uses for success.
pub const STATUS_OK: i32 = 200;

// ── Envelope ─────────────────────────────────────────────────────

/// A parsed reply document.
pub struct Envelope<'a> {
    doc: Document<'a>,
}

impl<'a> Envelope<'a> {
    /// Parse a reply body. Fails if the body is not XML or the top element
    /// is not `root`.
    pub fn parse(xml: &'a str) -> Result<Self, TransportError> {
        let doc = Document::parse(xml)?;
        let name = doc.root_element().tag_name().name();
        if name != "root" {
            return Err(TransportError::MalformedResponse(format!(
                "unexpected top element <{name}>"
            )));
        }
        Ok(Self { doc })
    }

    /// `status_code`, or 0 when the attribute is absent or not a number.
    pub fn status_code(&self) -> i32 {
        self.doc
            .root_element()
            .attribute("status_code")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn status_message(&self) -> &str {
        self.doc
            .root_element()
            .attribute("status_message")
            .unwrap_or("")
    }

    /// Check the envelope status. Has no side effects.
    pub fn verify(&self) -> Result<(), ControlPlaneError> {
        match self.status_code() {
            STATUS_OK => Ok(()),
            code => Err(ControlPlaneError::new(code, self.status_message())),
        }
    }

    /// Text of the first element named `tag`, anywhere in the document.
    ///
    /// `None` when the element is absent; `Some("")` when it is empty.
    pub fn text(&self, tag: &str) -> Option<&str> {
        self.doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == tag)
            .map(|n| n.text().unwrap_or("").trim())
    }

    /// Display modes listed in a server-info reply, ascending by
    /// `(width, height, refresh_rate)`.
    pub fn display_modes(&self) -> Vec<DisplayMode> {
        let mut modes: Vec<DisplayMode> = self
            .elements("DisplayMode")
            .map(|mode| DisplayMode {
                width: child_number(mode, "Width"),
                height: child_number(mode, "Height"),
                refresh_rate: child_number(mode, "RefreshRate"),
            })
            .collect();
        modes.sort();
        modes
    }

    /// The `<App>` entries of an app-list reply.
    ///
    /// Every entry must carry a non-zero `ID` and a non-empty `AppTitle`.
    pub fn apps(&self) -> Result<Vec<AppDescriptor>, TransportError> {
        let mut apps = Vec::new();
        for node in self.elements("App") {
            let app = AppDescriptor {
                id: child_number(node, "ID"),
                name: child_text(node, "AppTitle").unwrap_or("").to_string(),
                hdr_supported: child_text(node, "IsHdrSupported") == Some("1"),
            };
            if !app.is_initialized() {
                return Err(TransportError::MalformedResponse(
                    "invalid app list entry".into(),
                ));
            }
            apps.push(app);
        }
        Ok(apps)
    }

    fn elements<'s>(&'s self, tag: &'s str) -> impl Iterator<Item = Node<'s, 'a>> + 's {
        self.doc
            .descendants()
            .filter(move |n| n.is_element() && n.tag_name().name() == tag)
    }
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
        .map(|n| n.text().unwrap_or("").trim())
}

fn child_number(node: Node<'_, '_>, tag: &str) -> u32 {
    child_text(node, tag)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Parse `xml` and verify its envelope status in one step.
pub fn verify_status(xml: &str) -> Result<(), StrixError> {
    Envelope::parse(xml)?.verify()?;
    Ok(())
}

/// Display modes from a raw server-info reply; empty if it does not parse.
pub fn display_modes(xml: &str) -> Vec<DisplayMode> {
    Envelope::parse(xml)
        .map(|e| e.display_modes())
        .unwrap_or_default()
}

// ── Tests ────────────────────────────────────────────────────────
