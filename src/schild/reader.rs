//! SchILD XML Reader
//!
//! quick-xmlのイベントストリームからperson要素とmembership要素を抽出する。
//! 要素名はローカル名（名前空間プレフィックスなし）で比較します。

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::AntonToolError;
use crate::schild::schema::{path_eq, SchemaMapping, SourceField};
use crate::types::{Membership, SourceRecord};

/// 解析済みのSchILDエクスポート
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchildDocument {
    /// person要素（ドキュメント順）
    pub persons: Vec<SourceRecord>,
    /// membership要素（ドキュメント順）
    pub memberships: Vec<Membership>,
}

/// 現在解析中の要素
enum Scope {
    None,
    Person(SourceRecord),
    Membership(Membership),
}

/// SchILDのXMLエクスポートを解析する
///
/// # 戻り値
///
/// * `Ok(SchildDocument)` - 解析に成功した場合
/// * `Err(AntonToolError::Parse)` - XMLが不正な場合、ルート要素が想定と異なる場合、
///   person要素が1つもない場合
pub fn parse_document(
    content: &[u8],
    mapping: &SchemaMapping,
) -> Result<SchildDocument, AntonToolError> {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);

    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut document = SchildDocument::default();
    // ルートからの要素パス
    let mut stack: Vec<String> = Vec::new();
    // scopeが始まった要素のstack上の深さ
    let mut scope_depth = 0usize;
    let mut scope = Scope::None;
    let mut text = String::new();
    let mut seen_root = false;

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            AntonToolError::parse(location(&stack, &document, position), e.to_string())
        })?;

        match event {
            Event::Start(e) if !seen_root => {
                stack.push(check_root(&e, mapping, position)?);
                seen_root = true;
            }
            Event::Empty(e) if !seen_root => {
                check_root(&e, mapping, position)?;
                seen_root = true;
            }
            Event::Start(e) => {
                let name = local_name(&e);
                text.clear();
                stack.push(name);
                open_element(&e, &reader, &stack, &mut scope, &mut scope_depth, mapping, &document)?;
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                stack.push(name);
                open_element(&e, &reader, &stack, &mut scope, &mut scope_depth, mapping, &document)?;
                text.clear();
                close_element(&stack, &mut scope, scope_depth, &text, mapping, &mut document);
                stack.pop();
            }
            Event::Text(e) => {
                let unescaped = e.unescape().map_err(|err| {
                    AntonToolError::parse(location(&stack, &document, position), err.to_string())
                })?;
                text.push_str(&unescaped);
            }
            Event::CData(e) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(_) => {
                close_element(&stack, &mut scope, scope_depth, &text, mapping, &mut document);
                text.clear();
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(AntonToolError::parse(
            "document",
            "document has no root element",
        ));
    }
    if document.persons.is_empty() {
        return Err(AntonToolError::parse(
            mapping.root,
            format!("no <{}> elements found", mapping.person),
        ));
    }

    tracing::debug!(
        persons = document.persons.len(),
        memberships = document.memberships.len(),
        schema = mapping.version,
        "SchILD document parsed"
    );

    Ok(document)
}

/// 要素の開始時の処理（scopeの開始、役割属性の取得）
fn open_element(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    stack: &[String],
    scope: &mut Scope,
    scope_depth: &mut usize,
    mapping: &SchemaMapping,
    document: &SchildDocument,
) -> Result<(), AntonToolError> {
    let depth = stack.len();
    let name = stack[depth - 1].as_str();

    match scope {
        // ルート直下の要素のみscopeを開始する
        Scope::None if depth == 2 => {
            if name == mapping.person {
                *scope = Scope::Person(SourceRecord {
                    index: document.persons.len(),
                    ..Default::default()
                });
                *scope_depth = depth;
            } else if name == mapping.membership {
                *scope = Scope::Membership(Membership::default());
                *scope_depth = depth;
            }
        }
        Scope::Person(record) => {
            let relative = &stack[*scope_depth..];
            if path_eq(&[mapping.role_element], relative) {
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| {
                        AntonToolError::parse(
                            format!("{} (person #{})", stack.join("/"), record.index + 1),
                            format!("XML attribute error: {}", err),
                        )
                    })?;
                    if attr.key.local_name().as_ref() == mapping.role_attribute.as_bytes() {
                        let value = attr.decode_and_unescape_value(reader).map_err(|err| {
                            AntonToolError::parse(
                                format!("{} (person #{})", stack.join("/"), record.index + 1),
                                err.to_string(),
                            )
                        })?;
                        record.roles.push(value.trim().to_string());
                    }
                }
            }
        }
        _ => {}
    }

    Ok(())
}

/// 要素の終了時の処理（テキストの格納、scopeの終了）
fn close_element(
    stack: &[String],
    scope: &mut Scope,
    scope_depth: usize,
    text: &str,
    mapping: &SchemaMapping,
    document: &mut SchildDocument,
) {
    let depth = stack.len();

    if depth == scope_depth {
        match std::mem::replace(scope, Scope::None) {
            Scope::Person(record) => document.persons.push(record),
            Scope::Membership(membership) => document.memberships.push(membership),
            Scope::None => {}
        }
        return;
    }
    if depth < scope_depth {
        return;
    }

    let relative = &stack[scope_depth..];
    let value = text.trim();

    match scope {
        Scope::Person(record) => {
            let Some(field) = mapping.person_field(relative) else {
                return;
            };
            // 同じパスが複数回出現した場合は最初の値を使う
            let target = match field {
                SourceField::Reference => &mut record.reference,
                SourceField::Given => &mut record.given,
                SourceField::Family => &mut record.family,
                SourceField::FullName => &mut record.full_name,
                SourceField::Email => &mut record.email,
            };
            if target.is_empty() {
                *target = value.to_string();
            }
        }
        Scope::Membership(membership) => {
            if path_eq(mapping.membership_group_id, relative) {
                if membership.group_id.is_empty() {
                    membership.group_id = value.to_string();
                }
            } else if path_eq(mapping.membership_member_id, relative) && !value.is_empty() {
                membership.members.push(value.to_string());
            }
        }
        Scope::None => {}
    }
}

/// ルート要素名を検証する
fn check_root(
    e: &BytesStart<'_>,
    mapping: &SchemaMapping,
    position: usize,
) -> Result<String, AntonToolError> {
    let name = local_name(e);
    if name != mapping.root {
        return Err(AntonToolError::parse(
            format!("document @ byte {}", position),
            format!(
                "unexpected root element <{}>, expected <{}> ({})",
                name, mapping.root, mapping.version
            ),
        ));
    }
    Ok(name)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn location(stack: &[String], document: &SchildDocument, position: usize) -> String {
    let path = if stack.is_empty() {
        "document".to_string()
    } else {
        stack.join("/")
    };
    format!(
        "{} (after person #{}) @ byte {}",
        path,
        document.persons.len(),
        position
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<enterprise xmlns="http://www.imsglobal.org/xsd/imsep_v1p1">
  <properties><datasource>SchILD-NRW</datasource></properties>
  <person recstatus="1">
    <sourcedid><source>SchILD</source><id>ID-2409843-0075X</id></sourcedid>
    <name>
      <fn>Muster Anna</fn>
      <n><family>Muster</family><given>Anna</given></n>
    </name>
    <institutionrole institutionroletype="Student" primaryrole="Yes"/>
  </person>
  <person>
    <sourcedid><id>ID-2409844-0001L</id></sourcedid>
    <name><n><family>Lehr &amp; Co</family><given>Eva</given></n></name>
    <email>eva.lehr@schule.de</email>
    <institutionrole institutionroletype="Faculty"></institutionrole>
  </person>
  <membership>
    <sourcedid><id>ID-2409843-klasse-05A</id></sourcedid>
    <member>
      <sourcedid><id>ID-2409843-0075X</id></sourcedid>
      <idtype>1</idtype>
    </member>
  </membership>
</enterprise>"#;

    #[test]
    fn test_parse_persons_and_memberships() {
        let doc = parse_document(SAMPLE.as_bytes(), &SchemaMapping::schild_ims_v1()).unwrap();
        assert_eq!(doc.persons.len(), 2);

        let anna = &doc.persons[0];
        assert_eq!(anna.index, 0);
        assert_eq!(anna.reference, "ID-2409843-0075X");
        assert_eq!(anna.given, "Anna");
        assert_eq!(anna.family, "Muster");
        assert_eq!(anna.full_name, "Muster Anna");
        assert_eq!(anna.roles, vec!["Student".to_string()]);

        let eva = &doc.persons[1];
        assert_eq!(eva.family, "Lehr & Co");
        assert_eq!(eva.email, "eva.lehr@schule.de");
        assert_eq!(eva.roles, vec!["Faculty".to_string()]);

        assert_eq!(doc.memberships.len(), 1);
        assert_eq!(doc.memberships[0].group_id, "ID-2409843-klasse-05A");
        assert_eq!(doc.memberships[0].members, vec!["ID-2409843-0075X".to_string()]);
    }

    #[test]
    fn test_prefixed_namespace() {
        let xml = r#"<ims:enterprise xmlns:ims="urn:x"><ims:person><ims:sourcedid><ims:id>P1</ims:id></ims:sourcedid></ims:person></ims:enterprise>"#;
        let doc = parse_document(xml.as_bytes(), &SchemaMapping::schild_ims_v1()).unwrap();
        assert_eq!(doc.persons[0].reference, "P1");
    }

    #[test]
    fn test_utf8_bom_and_umlauts() {
        let mut xml = b"\xEF\xBB\xBF".to_vec();
        xml.extend_from_slice(
            "<enterprise><person><name><n><family>Müller</family><given>Jürgen</given></n></name></person></enterprise>"
                .as_bytes(),
        );
        let doc = parse_document(&xml, &SchemaMapping::schild_ims_v1()).unwrap();
        assert_eq!(doc.persons[0].family, "Müller");
        assert_eq!(doc.persons[0].given, "Jürgen");
    }

    #[test]
    fn test_wrong_root_element() {
        let result = parse_document(b"<roster><person/></roster>", &SchemaMapping::default());
        match result {
            Err(AntonToolError::Parse { message, .. }) => {
                assert!(message.contains("<roster>"));
            }
            _ => panic!("Expected Parse error"),
        }
    }

    #[test]
    fn test_mismatched_tags_report_location() {
        let xml = b"<enterprise><person><name></person></enterprise>";
        match parse_document(xml, &SchemaMapping::default()) {
            Err(AntonToolError::Parse { location, .. }) => {
                assert!(location.contains("enterprise/person/name"));
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_personless_documents() {
        assert!(matches!(
            parse_document(b"", &SchemaMapping::default()),
            Err(AntonToolError::Parse { .. })
        ));
        assert!(matches!(
            parse_document(b"<enterprise></enterprise>", &SchemaMapping::default()),
            Err(AntonToolError::Parse { .. })
        ));
    }

    #[test]
    fn test_nested_person_elements_are_not_scopes() {
        // ルート直下以外のperson要素は無視する
        let xml = b"<enterprise><group><person><sourcedid><id>X</id></sourcedid></person></group><person><sourcedid><id>Y</id></sourcedid></person></enterprise>";
        let doc = parse_document(xml, &SchemaMapping::default()).unwrap();
        assert_eq!(doc.persons.len(), 1);
        assert_eq!(doc.persons[0].reference, "Y");
    }

    #[test]
    fn test_role_attribute_is_unescaped() {
        let xml = br#"<enterprise><person><sourcedid><id>P1</id></sourcedid><institutionrole institutionroletype="&#83;tudent"/></person></enterprise>"#;
        let doc = parse_document(xml, &SchemaMapping::schild_ims_v1()).unwrap();
        assert_eq!(doc.persons[0].roles, vec!["Student".to_string()]);
    }
}
