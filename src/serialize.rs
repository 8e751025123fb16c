//! Writing object graphs back to commented YAML.

use crate::codec::CodecRegistry;
use crate::document::{Node, key_text};
use crate::error::{MapError, Result};
use crate::materialize::Context;
use crate::schema::{ConfigSection, schema_of};
use serde_yaml::{Mapping, Value};
use std::any::TypeId;

/// A flattened value ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted {
    /// Plain document value, dumped as-is.
    Plain(Value),
    /// Nested section whose fields keep their comments.
    Section(Vec<EmittedField>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmittedField {
    pub key: String,
    pub comments: Vec<String>,
    pub value: Emitted,
}

impl Emitted {
    /// Collapse to a plain value, dropping comments.
    pub fn into_value(self) -> Value {
        match self {
            Emitted::Plain(value) => value,
            Emitted::Section(fields) => {
                let mut map = Mapping::new();
                for field in fields {
                    let value = field.value.into_value();
                    if !value.is_null() {
                        map.insert(Value::String(field.key), value);
                    }
                }
                Value::Mapping(map)
            }
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Emitted::Plain(value) => value.is_null(),
            Emitted::Section(_) => false,
        }
    }
}

/// Flatten a section into a mapping in field order.
///
/// Excluded fields and fields that flatten to null are left out.
pub fn encode_object<S: ConfigSection>(value: &S, cx: &Context<'_>) -> Result<Value> {
    let schema = schema_of::<S>();
    let mut map = Mapping::new();
    for (field, binding) in schema.entries() {
        if field.excluded {
            continue;
        }
        let encoded = binding.encode(value, cx)?;
        if !encoded.is_null() {
            map.insert(Value::String(field.key.clone()), encoded);
        }
    }
    Ok(Value::Mapping(map))
}

/// Flatten a section, keeping each field's comments.
pub fn emit_object<S: ConfigSection>(value: &S, cx: &Context<'_>) -> Result<Emitted> {
    let schema = schema_of::<S>();
    let mut fields = Vec::new();
    for (field, binding) in schema.entries() {
        if field.excluded {
            continue;
        }
        fields.push(EmittedField {
            key: field.key.clone(),
            comments: field.comments.clone(),
            value: binding.emit(value, cx)?,
        });
    }
    Ok(Emitted::Section(fields))
}

/// Render `value` as YAML text.
///
/// Fields are written in schema order, each preceded by its comment lines.
/// Nested sections are written key by key so their comments survive.
pub fn to_yaml<S: ConfigSection>(value: &S, codecs: &CodecRegistry) -> Result<String> {
    let cx = Context::new(codecs);
    let mut out = String::new();
    if let Some(codec) = codecs.find(TypeId::of::<S>()) {
        let mut node = Node::new().with_codecs(codecs);
        codec.encode_any(value, &mut node)?;
        for (key, entry) in node.into_mapping() {
            write_plain(&mut out, &key, &entry, "")?;
        }
        return Ok(out);
    }

    if let Emitted::Section(fields) = emit_object(value, &cx)? {
        write_fields(&mut out, &fields, 0)?;
    }
    Ok(out)
}

fn write_fields(out: &mut String, fields: &[EmittedField], indent: usize) -> Result<()> {
    let pad = " ".repeat(indent);
    for field in fields {
        if field.value.is_blank() {
            continue;
        }
        for comment in &field.comments {
            for line in comment.lines() {
                out.push_str(&pad);
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
        }
        let key = Value::String(field.key.clone());
        match &field.value {
            Emitted::Section(children) if children.iter().all(|c| c.value.is_blank()) => {
                write_plain(out, &key, &Value::Mapping(Mapping::new()), &pad)?;
            }
            Emitted::Section(children) => {
                out.push_str(&pad);
                out.push_str(&render_key(&key)?);
                out.push_str(":\n");
                write_fields(out, children, indent + 2)?;
            }
            Emitted::Plain(value) => write_plain(out, &key, value, &pad)?,
        }
    }
    Ok(())
}

/// Dump `key: value` as a single-entry mapping, indented by `pad`.
fn write_plain(out: &mut String, key: &Value, value: &Value, pad: &str) -> Result<()> {
    let mut entry = Mapping::new();
    entry.insert(key.clone(), value.clone());
    let text = serde_yaml::to_string(&entry).map_err(|e| MapError::parse(key_origin(key), e))?;
    for line in text.lines() {
        // Blank lines inside block scalars stay blank.
        if !line.is_empty() {
            out.push_str(pad);
            out.push_str(line);
        }
        out.push('\n');
    }
    Ok(())
}

fn render_key(key: &Value) -> Result<String> {
    let text = serde_yaml::to_string(key).map_err(|e| MapError::parse(key_origin(key), e))?;
    Ok(text.trim_end().to_string())
}

fn key_origin(key: &Value) -> String {
    format!("field '{}'", key_text(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use crate::document::parse_document;
    use crate::materialize::materialize;
    use crate::schema::Schema;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Mode {
        Fast,
        Safe,
    }

    crate::config_enum!(Mode {
        Fast => "FAST",
        Safe => "SAFE",
    });

    #[derive(Debug, Default, PartialEq)]
    struct Limits {
        max: u32,
        burst: Option<u32>,
    }

    impl ConfigSection for Limits {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .field("max", |s| &s.max, |s| &mut s.max)
                .comment("Hard ceiling")
                .field("burst", |s| &s.burst, |s| &mut s.burst)
                .build()
        }
    }
    crate::config_section!(Limits);

    #[derive(Debug, PartialEq)]
    struct Service {
        name: String,
        mode: Mode,
        note: String,
        limits: Limits,
        hosts: HashMap<String, Vec<Limits>>,
        token: String,
        empty: Option<String>,
    }

    impl Default for Service {
        fn default() -> Self {
            Self {
                name: "api".to_string(),
                mode: Mode::Safe,
                note: "line one\n\nline three".to_string(),
                limits: Limits {
                    max: 10,
                    burst: Some(2),
                },
                hosts: HashMap::new(),
                token: "secret".to_string(),
                empty: None,
            }
        }
    }

    impl ConfigSection for Service {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .field("name", |s| &s.name, |s| &mut s.name)
                .comment("Service name")
                .comment("Shown in logs")
                .field("mode", |s| &s.mode, |s| &mut s.mode)
                .field("note", |s| &s.note, |s| &mut s.note)
                .field("limits", |s| &s.limits, |s| &mut s.limits)
                .key("rate-limits")
                .comment("Request limits")
                .field("hosts", |s| &s.hosts, |s| &mut s.hosts)
                .field("token", |s| &s.token, |s| &mut s.token)
                .ignore()
                .field("empty", |s| &s.empty, |s| &mut s.empty)
                .build()
        }
    }

    fn render(service: &Service) -> String {
        to_yaml(service, &CodecRegistry::new()).unwrap()
    }

    #[test]
    fn writes_comments_and_keys_in_declaration_order() {
        let text = render(&Service::default());
        let expected_prefix = "# Service name\n# Shown in logs\nname: api\nmode: SAFE\n";
        assert!(text.starts_with(expected_prefix), "got:\n{}", text);
        assert!(text.contains("# Request limits\nrate-limits:\n  # Hard ceiling\n  max: 10\n  burst: 2\n"));
        assert!(text.contains("hosts: {}\n"));
    }

    #[test]
    fn skips_excluded_and_null_fields() {
        let text = render(&Service::default());
        assert!(!text.contains("token"));
        assert!(!text.contains("secret"));
        assert!(!text.contains("empty"));
    }

    #[test]
    fn output_reads_back_to_equal_graph() {
        let mut service = Service::default();
        service.hosts.insert(
            "eu".to_string(),
            vec![
                Limits {
                    max: 1,
                    burst: None,
                },
                Limits {
                    max: 2,
                    burst: Some(5),
                },
            ],
        );
        service.mode = Mode::Fast;
        let text = render(&service);
        let doc = parse_document(&text, "rendered").unwrap();
        let back: Service = materialize(&doc, &CodecRegistry::new()).unwrap();
        assert_eq!(back.hosts, service.hosts);
        assert_eq!(back.mode, Mode::Fast);
        assert_eq!(back.note, "line one\n\nline three");
        assert_eq!(back.limits, service.limits);
    }

    #[test]
    fn rendering_is_stable() {
        let first = render(&Service::default());
        let doc = parse_document(&first, "rendered").unwrap();
        let back: Service = materialize(&doc, &CodecRegistry::new()).unwrap();
        assert_eq!(render(&back), first);
    }

    #[test]
    fn encode_object_drops_comments() {
        let codecs = CodecRegistry::new();
        let value = encode_object(&Service::default(), &Context::new(&codecs)).unwrap();
        let map = value.as_mapping().unwrap();
        let keys: Vec<_> = map.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["name", "mode", "note", "rate-limits", "hosts"]);
        let emitted = emit_object(&Service::default(), &Context::new(&codecs)).unwrap();
        assert_eq!(emitted.into_value(), value);
    }

    #[test]
    fn keys_that_need_quoting_are_quoted() {
        let mut out = String::new();
        write_plain(&mut out, &Value::String("yes".into()), &Value::from(1), "  ").unwrap();
        let parsed: Mapping = serde_yaml::from_str(out.trim_start()).unwrap();
        assert_eq!(parsed.get("yes"), Some(&Value::from(1)));
    }

    struct Stamp(u64);
    crate::config_codec!(Stamp);

    struct StampCodec;

    impl Codec for StampCodec {
        type Target = Stamp;

        fn decode(&self, node: &Node) -> Result<Stamp> {
            Ok(Stamp(node.int("epoch").unwrap_or_default() as u64))
        }

        fn encode(&self, value: &Stamp, node: &mut Node) -> Result<()> {
            node.set_value("epoch", Value::from(value.0));
            node.set_value("unit", Value::from("s"));
            Ok(())
        }
    }

    struct Record {
        created: Stamp,
    }

    impl ConfigSection for Record {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(|| Record { created: Stamp(0) })
                .field("created", |s| &s.created, |s| &mut s.created)
                .build()
        }
    }

    #[test]
    fn codec_output_is_written_as_mapping() {
        let mut codecs = CodecRegistry::new();
        codecs.register(StampCodec);
        let text = to_yaml(&Record { created: Stamp(42) }, &codecs).unwrap();
        assert_eq!(text, "created:\n  epoch: 42\n  unit: s\n");
        let back: Record = materialize(&parse_document(&text, "t").unwrap(), &codecs).unwrap();
        assert_eq!(back.created.0, 42);
    }

    #[test]
    fn codec_type_without_codec_fails_to_write() {
        let result = to_yaml(&Record { created: Stamp(1) }, &CodecRegistry::new());
        assert!(matches!(result, Err(MapError::Codec { .. })));
    }
}
