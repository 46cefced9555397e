//! Minimal HTML element tree exposed to example scripts.
//!
//! Scripts build trees with one function per tag:
//!
//! ```text
//! h1(#{ id: "hello-world" }, "Hello World!")
//! div(p("first"), p("second"), [li("a"), li("b")])
//! button(#{ on_click: || print("clicked") }, "Click me")
//! ```
//!
//! A map in first position holds attributes; function pointers under keys
//! starting with `on` become event handlers. Every other argument is a child.

use std::collections::BTreeMap;

use rhai::{Array, Dynamic, Engine, FnPtr, Map};

/// Tags registered as builder functions.
pub const TAGS: &[&str] = &[
    "a", "article", "aside", "b", "blockquote", "br", "button", "code", "div", "em", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "i", "img", "input", "label",
    "li", "main", "nav", "ol", "option", "p", "pre", "section", "select", "small", "span",
    "strong", "table", "tbody", "td", "textarea", "th", "thead", "tr", "ul",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

/// A node in a rendered tree.
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An HTML element with attributes, event handlers and children.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Event name (`click`, `input`, ...) to script handler
    pub handlers: BTreeMap<String, FnPtr>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Render to HTML, discarding event handlers.
    pub fn to_html(&self) -> String {
        Node::Element(self.clone()).render().html
    }

    fn set_attributes(&mut self, attributes: Map) {
        for (key, value) in attributes {
            let key = key.as_str();

            if value.is::<FnPtr>() {
                match event_name(key) {
                    Some(event) => {
                        self.handlers.insert(event, value.cast::<FnPtr>());
                    }
                    None => tracing::debug!("ignoring function attribute `{}`", key),
                }
                continue;
            }

            let name = match key {
                "class_name" | "className" => "class".to_string(),
                other => other.replace('_', "-"),
            };

            if value.is_unit() {
                continue;
            }
            if let Some(flag) = value.clone().try_cast::<bool>() {
                if flag {
                    self.attributes.insert(name, String::new());
                }
                continue;
            }
            self.attributes.insert(name, value.to_string());
        }
    }

    fn push_dynamic(&mut self, value: Dynamic) {
        if value.is_unit() {
            return;
        }
        if value.is::<Element>() {
            self.children.push(Node::Element(value.cast::<Element>()));
        } else if value.is_array() {
            for item in value.cast::<Array>() {
                self.push_dynamic(item);
            }
        } else {
            self.children.push(Node::Text(value.to_string()));
        }
    }
}

/// HTML output together with the handlers referenced by `data-on-*` ids.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub html: String,
    pub handlers: Vec<FnPtr>,
}

impl Node {
    /// Convert the value returned by a component constructor.
    ///
    /// Elements render as themselves, arrays as a sequence of siblings,
    /// unit as nothing and any other value as text.
    pub fn from_dynamic(value: Dynamic) -> Vec<Node> {
        let mut holder = Element::default();
        holder.push_dynamic(value);
        holder.children
    }

    /// Render this node, numbering event handlers from zero.
    pub fn render(&self) -> Rendered {
        let mut rendered = Rendered::default();
        self.write_html(&mut rendered);
        rendered
    }

    /// Render a sequence of sibling nodes.
    pub fn render_all(nodes: &[Node]) -> Rendered {
        let mut rendered = Rendered::default();
        for node in nodes {
            node.write_html(&mut rendered);
        }
        rendered
    }

    fn write_html(&self, out: &mut Rendered) {
        match self {
            Node::Text(text) => out.html.push_str(&escape(text)),
            Node::Element(element) => {
                out.html.push('<');
                out.html.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.html.push(' ');
                    out.html.push_str(name);
                    if !value.is_empty() {
                        out.html.push_str("=\"");
                        out.html.push_str(&escape(value));
                        out.html.push('"');
                    }
                }
                for (event, handler) in &element.handlers {
                    let id = out.handlers.len();
                    out.handlers.push(handler.clone());
                    out.html
                        .push_str(&format!(" data-on-{}=\"{}\"", escape(event), id));
                }
                out.html.push('>');

                if VOID_TAGS.contains(&element.tag.as_str()) {
                    return;
                }

                for child in &element.children {
                    child.write_html(out);
                }
                out.html.push_str("</");
                out.html.push_str(&element.tag);
                out.html.push('>');
            }
        }
    }
}

/// Escape text for use in HTML content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// `on_click`, `onClick` and `on-click` all map to `click`.
fn event_name(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    let rest = rest.trim_start_matches(['_', '-']);
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_lowercase())
}

fn build(tag: &str, args: Vec<Dynamic>) -> Element {
    let mut element = Element::new(tag);
    for (index, arg) in args.into_iter().enumerate() {
        if index == 0 && arg.is_map() {
            element.set_attributes(arg.cast::<Map>());
        } else {
            element.push_dynamic(arg);
        }
    }
    element
}

/// Register the element type and one builder per tag (zero to six arguments).
///
/// `element(tag, attributes, children)` builds any other tag, such as a
/// custom element.
pub fn register_builders(engine: &mut Engine) {
    engine.register_type_with_name::<Element>("Element");
    engine.register_fn("to_string", |element: &mut Element| element.to_html());
    engine.register_fn("element", |tag: &str, attributes: Map, children: Array| {
        let mut args = vec![Dynamic::from(attributes)];
        args.extend(children);
        build(tag, args)
    });

    for &tag in TAGS {
        engine.register_fn(tag, move || build(tag, Vec::new()));
        engine.register_fn(tag, move |a: Dynamic| build(tag, vec![a]));
        engine.register_fn(tag, move |a: Dynamic, b: Dynamic| build(tag, vec![a, b]));
        engine.register_fn(tag, move |a: Dynamic, b: Dynamic, c: Dynamic| {
            build(tag, vec![a, b, c])
        });
        engine.register_fn(tag, move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
            build(tag, vec![a, b, c, d])
        });
        engine.register_fn(
            tag,
            move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic, e: Dynamic| {
                build(tag, vec![a, b, c, d, e])
            },
        );
        engine.register_fn(
            tag,
            move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic, e: Dynamic, f: Dynamic| {
                build(tag, vec![a, b, c, d, e, f])
            },
        );
    }
}
