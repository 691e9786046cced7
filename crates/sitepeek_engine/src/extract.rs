use std::collections::HashMap;

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::ElementRef;

use crate::{DocumentTree, SiteInfo};

/// Head children the extractor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadTag {
    Title,
    Meta,
    Link,
}

impl HeadTag {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(HeadTag::Title),
            "meta" => Some(HeadTag::Meta),
            "link" => Some(HeadTag::Link),
            _ => None,
        }
    }
}

/// Returns the first `head` element in document order.
///
/// `descendants` walks the arena with an explicit cursor, so deeply nested
/// markup cannot blow the stack.
pub fn find_head(tree: &DocumentTree) -> Option<ElementRef<'_>> {
    let root: NodeRef<'_, Node> = tree.html().tree.root();
    root.descendants()
        .filter(|node| matches!(node.value(), Node::Element(element) if element.name() == "head"))
        .find_map(ElementRef::wrap)
}

pub trait Extractor: Send + Sync {
    fn extract(&self, head: ElementRef<'_>) -> SiteInfo;
}

/// Reads title, description, keywords and icon from the direct children of
/// `<head>`. Later tags overwrite earlier ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadExtractor {
    only_basic_info: bool,
}

impl HeadExtractor {
    pub fn new(only_basic_info: bool) -> Self {
        Self { only_basic_info }
    }
}

impl Extractor for HeadExtractor {
    fn extract(&self, head: ElementRef<'_>) -> SiteInfo {
        let mut info = SiteInfo::default();

        for child in head.children().filter_map(ElementRef::wrap) {
            let Some(tag) = HeadTag::from_name(child.value().name()) else {
                continue;
            };
            match tag {
                HeadTag::Title => info.title = first_child_text(child),
                HeadTag::Meta => {
                    let attrs = attribute_map(child);
                    match attr(&attrs, "name") {
                        "description" => info.description = attr(&attrs, "content").to_string(),
                        "keywords" if !self.only_basic_info => {
                            info.keywords = attr(&attrs, "content").to_string()
                        }
                        _ => {}
                    }
                }
                HeadTag::Link if !self.only_basic_info => {
                    let attrs = attribute_map(child);
                    if attr(&attrs, "rel") == "icon" {
                        info.icon_url = attr(&attrs, "href").to_string();
                    }
                }
                HeadTag::Link => {}
            }
        }

        info
    }
}

/// Text of the element's first child node; empty when there is none or it is
/// not text.
fn first_child_text(element: ElementRef<'_>) -> String {
    match element.first_child().map(|node| node.value()) {
        Some(Node::Text(text)) => String::from(&**text),
        _ => String::new(),
    }
}

/// Attribute name to value. html5ever drops repeated attributes while
/// tokenizing, so the first occurrence in the markup is the one seen here.
fn attribute_map<'a>(element: ElementRef<'a>) -> HashMap<&'a str, &'a str> {
    element.value().attrs().collect()
}

fn attr<'a>(attrs: &HashMap<&'a str, &'a str>, name: &str) -> &'a str {
    attrs.get(name).copied().unwrap_or_default()
}
