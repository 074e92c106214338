//! Mapping Module
//!
//! SourceRecordを役割ごとの固定マッピング関数でTargetRowに変換する。
//! 名前や識別子の正規化もここで行う。

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::api::Role;
use crate::error::ValidationError;
use crate::schild::SchemaMapping;
use crate::types::{Membership, SourceRecord, StudentRow, TargetRow, TeacherRow};

static CLASS_IN_GROUP_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)klasse-([^-\s]+)").expect("class pattern is a valid regex")
});

/// person ID → 正規化済みクラス名のマップを構築
///
/// グループIDに`klasse-<クラス>`を含むmembershipのみを対象とします。
/// 同じ生徒が複数のクラスに所属している場合は最後の値が使われます。
pub fn build_class_lookup(memberships: &[Membership]) -> HashMap<String, String> {
    let mut lookup = HashMap::new();
    for membership in memberships {
        let Some(class) = class_from_group_id(&membership.group_id) else {
            continue;
        };
        for member in &membership.members {
            lookup.insert(member.clone(), class.clone());
        }
    }
    lookup
}

/// グループIDからクラス名を抽出して正規化（`ID-1-klasse-5A` → `5a`）
pub fn class_from_group_id(group_id: &str) -> Option<String> {
    let raw = CLASS_IN_GROUP_ID.captures(group_id)?.get(1)?.as_str();
    let class = normalize_class(raw);
    if class.is_empty() {
        None
    } else {
        Some(class)
    }
}

/// クラス名の正規化
///
/// 空白を除去し、`0`と数字の2文字のクラスだけ先頭の`0`を落とし（`05` → `5`、
/// `05A`はそのまま）、末尾の英字を小文字にします（`5A` → `5a`, `EF` → `Ef`）。
pub fn normalize_class(raw: &str) -> String {
    let class: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let chars: Vec<char> = match class.as_bytes() {
        [b'0', d] if d.is_ascii_digit() => vec![char::from(*d)],
        _ => class.chars().collect(),
    };
    match chars.last() {
        Some(last) if chars.len() >= 2 && last.is_alphabetic() => {
            let mut normalized: String = chars[..chars.len() - 1].iter().collect();
            normalized.extend(last.to_lowercase());
            normalized
        }
        _ => chars.into_iter().collect(),
    }
}

/// 名前の正規化（前後の空白除去、連続する空白を1つに）
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Referenzから敬称を導出
///
/// `ID-2409843-0075X`の中央のトークンの末尾の数字が`3`なら`Herr`、`4`なら`Frau`。
/// 判定できない場合は空文字列を返します。
pub fn salutation_from_reference(reference: &str) -> &'static str {
    let mut parts = reference.trim().split('-');
    let middle = match (parts.next(), parts.next()) {
        (Some(_), Some(middle)) => middle,
        _ => return "",
    };
    match middle.chars().last() {
        Some('3') => "Herr",
        Some('4') => "Frau",
        _ => "",
    }
}

/// (名, 姓)を取得
///
/// `given`と`family`が両方とも空の場合は`fn`（`姓 名…`）を分割します。
/// トークンが1つだけの場合は名として扱います。
pub fn split_name(record: &SourceRecord) -> (String, String) {
    let given = normalize_name(&record.given);
    let family = normalize_name(&record.family);
    if !given.is_empty() || !family.is_empty() {
        return (given, family);
    }

    let full = normalize_name(&record.full_name);
    match full.split_once(' ') {
        Some((family, given)) => (given.to_string(), family.to_string()),
        None => (full, String::new()),
    }
}

/// レコードを出力行に変換
///
/// 役割を判定し、役割ごとの固定マッピング関数を適用します。
///
/// # 戻り値
///
/// * `Ok(TargetRow)` - 必須フィールドがすべて揃っている場合
/// * `Err(ValidationError)` - 役割不明、Referenzなし、名前なしの場合
pub fn map_record(
    record: &SourceRecord,
    schema: &SchemaMapping,
    classes: &HashMap<String, String>,
) -> Result<TargetRow, ValidationError> {
    let role = schema
        .classify(&record.roles, !record.email.trim().is_empty())
        .ok_or(ValidationError::UnknownRole)?;

    match role {
        Role::Student => map_student(record, classes).map(TargetRow::Student),
        Role::Teacher => map_teacher(record).map(TargetRow::Teacher),
    }
}

fn map_student(
    record: &SourceRecord,
    classes: &HashMap<String, String>,
) -> Result<StudentRow, ValidationError> {
    let (reference, first_name, last_name) = mandatory_fields(record)?;
    let class = classes.get(&reference).cloned().unwrap_or_default();

    Ok(StudentRow {
        first_name,
        last_name,
        class,
        reference,
    })
}

fn map_teacher(record: &SourceRecord) -> Result<TeacherRow, ValidationError> {
    let (reference, first_name, last_name) = mandatory_fields(record)?;

    Ok(TeacherRow {
        salutation: salutation_from_reference(&reference).to_string(),
        first_name,
        last_name,
        reference,
    })
}

/// (Referenz, 名, 姓)
fn mandatory_fields(record: &SourceRecord) -> Result<(String, String, String), ValidationError> {
    let (first_name, last_name) = split_name(record);
    if first_name.is_empty() && last_name.is_empty() {
        return Err(ValidationError::MissingField("Name"));
    }

    let reference = record.reference.trim().to_string();
    if reference.is_empty() {
        return Err(ValidationError::MissingField("Referenz"));
    }

    Ok((reference, first_name, last_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(reference: &str, given: &str, family: &str, roles: &[&str]) -> SourceRecord {
        SourceRecord {
            reference: reference.to_string(),
            given: given.to_string(),
            family: family.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_class() {
        assert_eq!(normalize_class("5A"), "5a");
        assert_eq!(normalize_class("05"), "5");
        assert_eq!(normalize_class("00"), "0");
        // 2文字の`0<数字>`以外は`0`を残す
        assert_eq!(normalize_class("05A"), "05a");
        assert_eq!(normalize_class("005"), "005");
        assert_eq!(normalize_class("0"), "0");
        assert_eq!(normalize_class(" 10 B "), "10b");
        assert_eq!(normalize_class("Q1"), "Q1");
        assert_eq!(normalize_class("EF"), "Ef");
        assert_eq!(normalize_class("7"), "7");
        assert_eq!(normalize_class(""), "");
    }

    #[test]
    fn test_class_from_group_id() {
        assert_eq!(
            class_from_group_id("ID-2409843-klasse-05"),
            Some("5".to_string())
        );
        assert_eq!(
            class_from_group_id("ID-2409843-klasse-05A"),
            Some("05a".to_string())
        );
        assert_eq!(class_from_group_id("ID-1-KLASSE-7c"), Some("7c".to_string()));
        assert_eq!(class_from_group_id("ID-1-kurs-M-GK1"), None);
    }

    #[test]
    fn test_build_class_lookup() {
        let memberships = vec![
            Membership {
                group_id: "ID-1-klasse-5A".to_string(),
                members: vec!["S1".to_string(), "S2".to_string()],
            },
            Membership {
                group_id: "ID-1-kurs-Englisch".to_string(),
                members: vec!["S1".to_string()],
            },
        ];
        let lookup = build_class_lookup(&memberships);
        assert_eq!(lookup.get("S1").map(String::as_str), Some("5a"));
        assert_eq!(lookup.get("S2").map(String::as_str), Some("5a"));
        assert_eq!(lookup.len(), 2);
    }

    #[test]
    fn test_salutation_from_reference() {
        assert_eq!(salutation_from_reference("ID-2409843-0075X"), "Herr");
        assert_eq!(salutation_from_reference("ID-2409844-0001L"), "Frau");
        assert_eq!(salutation_from_reference("ID-2409845-0001L"), "");
        assert_eq!(salutation_from_reference("ID"), "");
        assert_eq!(salutation_from_reference(""), "");
    }

    #[test]
    fn test_split_name_fallback_to_full_name() {
        let mut r = record("P1", "", "", &["student"]);
        r.full_name = "Muster  Anna Lena".to_string();
        assert_eq!(
            split_name(&r),
            ("Anna Lena".to_string(), "Muster".to_string())
        );

        r.full_name = "Cher".to_string();
        assert_eq!(split_name(&r), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn test_map_student_with_class() {
        let mut classes = HashMap::new();
        classes.insert("S1".to_string(), "5a".to_string());

        let row = map_record(
            &record(" S1 ", " Anna ", "Muster", &["Student"]),
            &SchemaMapping::default(),
            &classes,
        )
        .unwrap();

        assert_eq!(
            row,
            TargetRow::Student(StudentRow {
                first_name: "Anna".to_string(),
                last_name: "Muster".to_string(),
                class: "5a".to_string(),
                reference: "S1".to_string(),
            })
        );
    }

    #[test]
    fn test_map_teacher_with_salutation() {
        let row = map_record(
            &record("ID-2409844-0001L", "Eva", "Lehr", &["Faculty"]),
            &SchemaMapping::default(),
            &HashMap::new(),
        )
        .unwrap();

        match row {
            TargetRow::Teacher(t) => {
                assert_eq!(t.salutation, "Frau");
                assert_eq!(t.last_name, "Lehr");
            }
            _ => panic!("Expected teacher row"),
        }
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let schema = SchemaMapping::default();
        let classes = HashMap::new();

        assert_eq!(
            map_record(&record("S1", "", "", &["student"]), &schema, &classes),
            Err(ValidationError::MissingField("Name"))
        );
        assert_eq!(
            map_record(&record("  ", "Anna", "Muster", &["student"]), &schema, &classes),
            Err(ValidationError::MissingField("Referenz"))
        );
        assert_eq!(
            map_record(&record("X", "Anna", "Muster", &[]), &schema, &classes),
            Err(ValidationError::UnknownRole)
        );
    }

    proptest! {
        #[test]
        fn prop_normalize_name_is_idempotent(name in "[ a-zA-ZäöüÄÖÜß\t]{0,40}") {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once.clone());
            prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
            prop_assert!(!once.contains("  "));
        }

        #[test]
        fn prop_normalize_class_is_idempotent(class in "[0-9]{1,2}[a-zA-Z]?") {
            let once = normalize_class(&class);
            prop_assert_eq!(normalize_class(&once), once);
        }

        #[test]
        fn prop_mapped_rows_trace_back_to_source(
            given in "[A-Za-zäöü]{1,12}",
            family in "[A-Za-zäöü]{1,12}",
            reference in "ID-[0-9]{7}-[0-9]{4}[A-Z]",
        ) {
            let row = map_record(
                &record(&reference, &given, &family, &["Student"]),
                &SchemaMapping::default(),
                &HashMap::new(),
            ).unwrap();
            match row {
                TargetRow::Student(s) => {
                    prop_assert_eq!(s.first_name, given);
                    prop_assert_eq!(s.last_name, family);
                    prop_assert_eq!(s.reference, reference);
                }
                _ => prop_assert!(false, "expected student row"),
            }
        }
    }
}
