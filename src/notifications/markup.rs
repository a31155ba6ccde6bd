// DOM helpers for notification HTML bodies.
//
// System notifications are rendered as a single paragraph whose children sit
// at fixed positions: a marker emoji, a user mention link, literal text, a
// post link. The helpers here look children up by position and turn
// missing pieces into `MalformedNotification` errors naming the field.
//
// Positions count every child node, text included, the same way the
// markup is served. A mention link looks like
// `<a href="/id/42"><img src="/pp/42" alt="@alice">@alice</a>`.

use scraper::{ElementRef, Html, Node};

use crate::error::{DramaError, Result};

/// A parsed `body_html` fragment.
pub struct Fragment {
    html: Html,
}

/// One child of the container paragraph.
#[derive(Debug, Clone, Copy)]
pub enum Child<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
}

impl<'a> Child<'a> {
    /// The string itself for text, descendant text for elements.
    pub fn text(&self) -> String {
        match self {
            Child::Element(el) => el.text().collect(),
            Child::Text(text) => text.to_string(),
        }
    }

    pub fn as_element(&self) -> Option<ElementRef<'a>> {
        match self {
            Child::Element(el) => Some(*el),
            Child::Text(_) => None,
        }
    }

    /// Whether this is an `<img>` with exactly this alt text.
    pub fn is_image_with_alt(&self, alt: &str) -> bool {
        self.as_element().is_some_and(|el| {
            el.value().name() == "img" && el.value().attr("alt") == Some(alt)
        })
    }

    fn is_blank(&self) -> bool {
        matches!(self, Child::Text(text) if text.trim().is_empty())
    }
}

impl Fragment {
    pub fn parse(body_html: &str) -> Self {
        Self {
            html: Html::parse_fragment(body_html),
        }
    }

    /// First `<p>` in the fragment, or the fragment root when there is none.
    fn container(&self) -> ElementRef<'_> {
        let root = self.html.root_element();
        root.descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "p")
            .unwrap_or(root)
    }

    /// Element and text children of the container, in document order.
    pub fn children(&self) -> Vec<Child<'_>> {
        self.container()
            .children()
            .filter_map(|node| match node.value() {
                Node::Element(_) => ElementRef::wrap(node).map(Child::Element),
                Node::Text(text) => Some(Child::Text(&**text)),
                _ => None,
            })
            .collect()
    }

    /// Last child that is not whitespace-only text.
    pub fn last_child(&self) -> Option<Child<'_>> {
        self.children().into_iter().rev().find(|c| !c.is_blank())
    }

    /// All text in the fragment with tags stripped.
    pub fn text(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// Child at `index`, or a malformed error naming `field`.
pub fn child<'a>(children: &[Child<'a>], index: usize, id: u64, field: &str) -> Result<Child<'a>> {
    children
        .get(index)
        .copied()
        .ok_or_else(|| DramaError::malformed(id, field))
}

/// The child as an element, or a malformed error naming `field`.
pub fn element<'a>(child: Child<'a>, id: u64, field: &str) -> Result<ElementRef<'a>> {
    child
        .as_element()
        .ok_or_else(|| DramaError::malformed(id, field))
}

/// Numeric id from a link like `/id/42` or `/post/99/some-title`.
pub fn href_id(link: ElementRef<'_>, id: u64, field: &str) -> Result<u64> {
    link.value()
        .attr("href")
        .and_then(|href| href.split('/').nth(2))
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| DramaError::malformed(id, format!("{field}.href")))
}

/// Username from a mention link, without the leading `@`.
///
/// Prefers the embedded profile image's alt text and falls back to the
/// link's own text.
pub fn mention_name(link: ElementRef<'_>, id: u64, field: &str) -> Result<String> {
    let from_alt = link
        .descendants()
        .filter_map(|node| node.value().as_element())
        .filter(|el| el.name() == "img")
        .filter_map(|el| el.attr("alt"))
        .find_map(|alt| alt.trim().strip_prefix('@'))
        .map(str::to_string);

    let name = from_alt.or_else(|| {
        let text: String = link.text().collect();
        text.trim().strip_prefix('@').map(str::to_string)
    });

    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(DramaError::malformed(id, format!("{field}.username"))),
    }
}

/// User id and name from the mention link at position `index`.
pub fn user_link(children: &[Child<'_>], index: usize, id: u64) -> Result<(u64, String)> {
    let field = format!("body_html.child[{index}]");
    let link = element(child(children, index, id, &field)?, id, &field)?;
    Ok((href_id(link, id, &field)?, mention_name(link, id, &field)?))
}
