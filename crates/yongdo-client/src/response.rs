//! Reading public-data XML replies into an ordered list of text nodes.
//!
//! Only text matters to the zoning scan, so the tree is flattened: every
//! run of character data becomes a [`TextNode`] tagged with its innermost
//! enclosing element.

use quick_xml::Reader;
use quick_xml::events::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub tag: String,
    pub text: String,
}

/// A parsed reply body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: String,
    pub nodes: Vec<TextNode>,
}

impl XmlDocument {
    /// Text of the first element named `tag`.
    pub fn first_text(&self, tag: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.tag == tag)
            .map(|n| n.text.as_str())
    }

    /// All text, in document order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.text.as_str())
    }

    /// Text of every element named `tag`, in document order.
    pub fn texts_in<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> {
        self.nodes
            .iter()
            .filter(move |n| n.tag == tag)
            .map(|n| n.text.as_str())
    }

    /// The service's own status message (`resultMsg`).
    pub fn result_msg(&self) -> Option<&str> {
        self.first_text("resultMsg")
    }

    /// Error reported by the portal gateway instead of the service.
    ///
    /// Key problems (unregistered key, expired key, quota) never reach the
    /// service; the gateway answers with an `OpenAPI_ServiceResponse`
    /// envelope carrying `errMsg`, `returnAuthMsg` and `returnReasonCode`.
    pub fn gateway_error(&self) -> Option<String> {
        let err = self.first_text("errMsg");
        let auth = self.first_text("returnAuthMsg");
        let code = self.first_text("returnReasonCode");
        if err.is_none() && auth.is_none() {
            return None;
        }
        let mut msg = match (err, auth) {
            (Some(e), Some(a)) => format!("{e}: {a}"),
            (Some(m), None) | (None, Some(m)) => m.to_string(),
            (None, None) => String::new(),
        };
        if let Some(code) = code {
            msg.push_str(&format!(" (returnReasonCode {code})"));
        }
        Some(msg)
    }
}

/// Parse `body` as XML.
///
/// Fails on syntax errors, mismatched or unclosed tags, and bodies without
/// a root element (JSON, plain text).
pub fn parse_xml(body: &str) -> Result<XmlDocument, String> {
    let mut reader = Reader::from_str(body);
    let mut stack: Vec<String> = Vec::new();
    let mut root: Option<String> = None;
    let mut buf = String::new();
    let mut nodes = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML error at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err("more than one root element".to_string());
                }
                flush(&mut buf, stack.last(), &mut nodes);
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                root.get_or_insert_with(|| name.clone());
                stack.push(name);
            }
            Event::Empty(e) => {
                if stack.is_empty() && root.is_none() {
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
            }
            Event::End(_) => {
                flush(&mut buf, stack.last(), &mut nodes);
                stack.pop();
            }
            Event::Text(e) => {
                let raw = String::from_utf8_lossy(&e);
                let text = quick_xml::escape::unescape(&raw)
                    .map_err(|e| format!("bad escape in text: {e}"))?;
                if !stack.is_empty() {
                    buf.push_str(&text);
                }
            }
            Event::CData(e) => {
                if !stack.is_empty() {
                    buf.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(&e);
                let resolved = resolve_reference(&name)
                    .ok_or_else(|| format!("unknown entity &{name};"))?;
                if !stack.is_empty() {
                    buf.push_str(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{open}>"));
    }
    let root = root.ok_or_else(|| "no root element".to_string())?;
    Ok(XmlDocument { root, nodes })
}

fn flush(buf: &mut String, tag: Option<&String>, nodes: &mut Vec<TextNode>) {
    let text = buf.trim();
    if let Some(tag) = tag
        && !text.is_empty()
    {
        nodes.push(TextNode {
            tag: tag.clone(),
            text: text.to_string(),
        });
    }
    buf.clear();
}

/// Resolve `name` from `&name;`: character references and the five
/// predefined XML entities.
fn resolve_reference(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    quick_xml::escape::resolve_predefined_entity(name).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NORMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <header>
    <resultCode>00</resultCode>
    <resultMsg>NORMAL SERVICE</resultMsg>
  </header>
  <body>
    <items>
      <item>
        <pnu>1159010700100840008</pnu>
        <prposAreaDstrcCodeNm>제2종일반주거지역</prposAreaDstrcCodeNm>
      </item>
      <item>
        <prposAreaDstrcCodeNm>가축사육제한구역</prposAreaDstrcCodeNm>
      </item>
    </items>
  </body>
</response>"#;

    #[test]
    fn flattens_text_in_document_order() {
        let doc = parse_xml(NORMAL).unwrap();
        assert_eq!(doc.root, "response");
        assert_eq!(doc.result_msg(), Some("NORMAL SERVICE"));
        let texts: Vec<&str> = doc.texts().collect();
        assert_eq!(
            texts,
            vec![
                "00",
                "NORMAL SERVICE",
                "1159010700100840008",
                "제2종일반주거지역",
                "가축사육제한구역"
            ]
        );
        let tagged: Vec<&str> = doc.texts_in("prposAreaDstrcCodeNm").collect();
        assert_eq!(tagged, vec!["제2종일반주거지역", "가축사육제한구역"]);
    }

    #[test]
    fn gateway_envelope() {
        let body = "<OpenAPI_ServiceResponse><cmmMsgHeader>\
            <errMsg>SERVICE ERROR</errMsg>\
            <returnAuthMsg>SERVICE_KEY_IS_NOT_REGISTERED_ERROR</returnAuthMsg>\
            <returnReasonCode>30</returnReasonCode>\
            </cmmMsgHeader></OpenAPI_ServiceResponse>";
        let doc = parse_xml(body).unwrap();
        assert_eq!(doc.result_msg(), None);
        assert_eq!(
            doc.gateway_error().as_deref(),
            Some("SERVICE ERROR: SERVICE_KEY_IS_NOT_REGISTERED_ERROR (returnReasonCode 30)")
        );
    }

    #[test]
    fn entities_and_cdata() {
        let doc = parse_xml("<r><a>A &amp; B &#xAC00;</a><b><![CDATA[<준주거지역>]]></b></r>").unwrap();
        assert_eq!(doc.first_text("a"), Some("A & B 가"));
        assert_eq!(doc.first_text("b"), Some("<준주거지역>"));
    }

    #[test]
    fn namespace_prefix_is_dropped() {
        let doc = parse_xml(r#"<ns:r xmlns:ns="urn:x"><ns:resultMsg>OK</ns:resultMsg></ns:r>"#)
            .unwrap();
        assert_eq!(doc.root, "r");
        assert_eq!(doc.result_msg(), Some("OK"));
    }

    #[test]
    fn mixed_content_splits_around_children() {
        let doc = parse_xml("<r>before<c>child</c>after</r>").unwrap();
        let nodes: Vec<(&str, &str)> = doc
            .nodes
            .iter()
            .map(|n| (n.tag.as_str(), n.text.as_str()))
            .collect();
        assert_eq!(nodes, vec![("r", "before"), ("c", "child"), ("r", "after")]);
    }

    #[test]
    fn rejects_non_xml() {
        assert!(parse_xml(r#"{"response": {"status": "OK"}}"#).is_err());
        assert!(parse_xml("").is_err());
        assert!(parse_xml("Unexpected errors").is_err());
    }

    #[test]
    fn rejects_broken_trees() {
        assert!(parse_xml("<a><b></a>").is_err());
        assert!(parse_xml("<a><b>text</b>").is_err());
    }

    #[test]
    fn self_closing_root() {
        let doc = parse_xml("<empty/>").unwrap();
        assert_eq!(doc.root, "empty");
        assert!(doc.nodes.is_empty());
    }
}
