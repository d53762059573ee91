//! Conversion of upstream landing-report XML into the JSON document shape
//! consumed by [`crate::document::flatten`].
//!
//! Rules:
//! - attributes become `@key` entries;
//! - a child element tag that repeats becomes an array, a single one stays a
//!   value;
//! - an element with only text becomes a string;
//! - text on an element that also has attributes goes under `#text`;
//! - text on an element that has child elements is dropped.

use quick_xml::{Reader, events::BytesStart, events::Event};
use serde_json::{Map, Value};

use crate::{Error, Result};

struct Frame {
  name:     String,
  attrs:    Map<String, Value>,
  children: Map<String, Value>,
  text:     String,
}

impl Frame {
  fn open(start: &BytesStart<'_>) -> Result<Self> {
    let mut attrs = Map::new();
    for attr in start.attributes() {
      let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
      if attr.key.as_namespace_binding().is_some() {
        continue;
      }
      let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
      let value = attr.unescape_value().map_err(|e| Error::Xml(e.to_string()))?;
      attrs.insert(format!("@{key}"), Value::String(value.into_owned()));
    }

    Ok(Self {
      name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
      attrs,
      children: Map::new(),
      text: String::new(),
    })
  }

  fn close(self) -> (String, Value) {
    let Self { name, mut attrs, children, text } = self;
    let text = text.trim();

    let value = if !children.is_empty() {
      attrs.extend(children);
      Value::Object(attrs)
    } else if text.is_empty() {
      Value::Object(attrs)
    } else if attrs.is_empty() {
      Value::String(text.to_owned())
    } else {
      attrs.insert("#text".to_owned(), Value::String(text.to_owned()));
      Value::Object(attrs)
    };

    (name, value)
  }

  fn push_child(&mut self, name: String, value: Value) {
    match self.children.get_mut(&name) {
      Some(Value::Array(values)) => values.push(value),
      Some(existing) => {
        let first = existing.take();
        *existing = Value::Array(vec![first, value]);
      }
      None => {
        self.children.insert(name, value);
      }
    }
  }
}

/// Convert an XML document into its JSON form. The root element's content
/// is returned directly, without a wrapper keyed by the root tag.
pub fn document_from_xml(xml: &str) -> Result<Value> {
  let mut reader = Reader::from_str(xml);
  reader.config_mut().trim_text(true);

  let mut stack: Vec<Frame> = Vec::new();
  let mut root: Option<Value> = None;

  loop {
    match reader.read_event() {
      Ok(Event::Start(ref e)) => stack.push(Frame::open(e)?),
      Ok(Event::Empty(ref e)) => {
        let (name, value) = Frame::open(e)?.close();
        attach(&mut stack, &mut root, name, value);
      }
      Ok(Event::Text(ref t)) => {
        if let Some(top) = stack.last_mut() {
          let text = t.unescape().map_err(|e| Error::Xml(e.to_string()))?;
          top.text.push_str(&text);
        }
      }
      Ok(Event::CData(ref c)) => {
        if let Some(top) = stack.last_mut() {
          top.text.push_str(&String::from_utf8_lossy(c));
        }
      }
      Ok(Event::End(_)) => {
        let frame = stack
          .pop()
          .ok_or_else(|| Error::Xml("unbalanced closing tag".into()))?;
        let (name, value) = frame.close();
        attach(&mut stack, &mut root, name, value);
      }
      Ok(Event::Eof) => break,
      Err(e) => return Err(Error::Xml(e.to_string())),
      _ => {}
    }
  }

  if !stack.is_empty() {
    return Err(Error::Xml("unexpected end of document".into()));
  }
  root.ok_or_else(|| Error::Xml("document has no root element".into()))
}

fn attach(stack: &mut [Frame], root: &mut Option<Value>, name: String, value: Value) {
  match stack.last_mut() {
    Some(parent) => parent.push_child(name, value),
    None => *root = Some(value),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn converts_attributes_text_and_repeats() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
      <landing_report data_entry_user="clerk1">
        <landing_report_id>12345</landing_report_id>
        <status desc="Final">F</status>
        <header>
          <vessel name="NORTHERN DAWN">54321</vessel>
          <stat_area_worksheet>
            <item_number>1</item_number>
            <stat_area fed_area="630" iphc_area="3A">525702</stat_area>
          </stat_area_worksheet>
        </header>
        <line_item><item_number>1</item_number><weight>10.5</weight></line_item>
        <line_item><item_number>2</item_number><weight>3</weight></line_item>
      </landing_report>"#;

    let doc = document_from_xml(xml).unwrap();
    assert_eq!(
      doc,
      json!({
        "@data_entry_user": "clerk1",
        "landing_report_id": "12345",
        "status": { "@desc": "Final", "#text": "F" },
        "header": {
          "vessel": { "@name": "NORTHERN DAWN", "#text": "54321" },
          "stat_area_worksheet": {
            "item_number": "1",
            "stat_area": { "@fed_area": "630", "@iphc_area": "3A", "#text": "525702" }
          }
        },
        "line_item": [
          { "item_number": "1", "weight": "10.5" },
          { "item_number": "2", "weight": "3" }
        ]
      })
    );
  }

  #[test]
  fn strips_namespace_prefixes_and_unescapes() {
    let xml = r#"<ns:report xmlns:ns="urn:x"><ns:port name="Dutch &amp; Co">DUT</ns:port><ns:empty/></ns:report>"#;
    let doc = document_from_xml(xml).unwrap();
    assert_eq!(doc["port"], json!({ "@name": "Dutch & Co", "#text": "DUT" }));
    assert_eq!(doc["empty"], json!({}));
    assert!(doc.get("@ns").is_none());
  }

  #[test]
  fn converted_document_flattens() {
    let xml = "<landing_report><landing_report_id>9</landing_report_id>\
               <line_item><species name=\"Halibut\">200</species></line_item>\
               </landing_report>";
    let bundle = crate::document::flatten(&document_from_xml(xml).unwrap()).unwrap();
    assert_eq!(bundle.id(), 9);
    assert_eq!(bundle.items[0].species.name.as_deref(), Some("Halibut"));
  }

  #[test]
  fn malformed_documents_are_rejected() {
    assert!(matches!(document_from_xml(""), Err(Error::Xml(_))));
    assert!(matches!(document_from_xml("<a><b></a>"), Err(Error::Xml(_))));
    assert!(matches!(document_from_xml("<a><b>"), Err(Error::Xml(_))));
  }
}
