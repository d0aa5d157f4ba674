//! HTML serialization of render nodes.
//!
//! In edit mode each content element is wrapped in an editor shell carrying
//! the drag handle and toolbar. A leaf's inner element matches the preview
//! output exactly; a container's inner element matches it once the shells
//! around its descendants are taken away.

use std::fmt::Write;

use super::{Affordances, Element, RenderNode};
use crate::slots::inline_css;

pub fn to_html(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &RenderNode) {
    match &node.affordances {
        Some(affordances) => {
            write_editor_open(out, node, affordances);
            write_content(out, node);
            out.push_str("</div>");
        }
        None => write_content(out, node),
    }
}

fn write_editor_open(out: &mut String, node: &RenderNode, affordances: &Affordances) {
    let mut classes = vec!["slot-editable"];
    if affordances.selected {
        classes.push("slot-selected");
    }
    if affordances.drop_zone {
        classes.push("slot-drop-zone");
    }
    let _ = write!(
        out,
        "<div class=\"{}\" data-slot-id=\"{}\" data-slot-type=\"{}\" draggable=\"{}\">",
        classes.join(" "),
        escape_html(node.slot_id.as_str()),
        escape_html(node.slot_type.tag()),
        affordances.draggable,
    );
    let _ = write!(
        out,
        "<div class=\"slot-toolbar\"><span class=\"slot-drag-handle\"></span>{}</div>",
        escape_html(&affordances.label)
    );
}

fn write_content(out: &mut String, node: &RenderNode) {
    let attrs = build_attrs(node);
    match &node.element {
        Element::Text { text } => {
            let _ = write!(out, "<div{}>{}</div>", attrs, escape_html(text));
        }
        Element::Button { label } => {
            let _ = write!(out, "<button type=\"button\"{}>{}</button>", attrs, escape_html(label));
        }
        Element::Image { src, alt } => {
            let _ = write!(
                out,
                "<img src=\"{}\" alt=\"{}\"{}>",
                escape_html(src),
                escape_html(alt),
                attrs
            );
        }
        Element::Container { .. } => {
            let _ = write!(out, "<div{}>", attrs);
            for child in &node.children {
                write_node(out, child);
            }
            out.push_str("</div>");
        }
        Element::Raw { markup } => {
            let _ = write!(out, "<div{}>{}</div>", attrs, markup);
        }
    }
}

fn build_attrs(node: &RenderNode) -> String {
    let mut attrs = format!(" data-slot=\"{}\"", escape_html(node.slot_id.as_str()));
    if let Some(class_name) = node.class_name.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(attrs, " class=\"{}\"", escape_html(class_name));
    }
    if !node.style.is_empty() {
        let _ = write!(attrs, " style=\"{}\"", escape_html(&inline_css(&node.style)));
    }
    attrs
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
