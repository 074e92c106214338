//! SchILD Schema Mapping
//!
//! 入力XMLの構造を明示的なバージョン付きマッピング表として表現する。
//! SchILDのエクスポート形式が変わった場合は、コードではなくこの表を変更する。

use crate::api::Role;

/// person要素内のどのフィールドに値を格納するか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceField {
    Reference,
    Given,
    Family,
    FullName,
    Email,
}

/// 入力XMLの構造定義（バージョン付き）
///
/// パスはperson要素（またはmembership要素）からの相対パスで、
/// 名前空間プレフィックスを除いたローカル名で比較されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMapping {
    /// マッピング表のバージョン
    pub version: &'static str,
    /// ルート要素名
    pub root: &'static str,
    /// person要素名
    pub person: &'static str,
    /// membership要素名
    pub membership: &'static str,
    /// person要素内のフィールドパス → 格納先
    pub person_fields: &'static [(&'static [&'static str], SourceField)],
    /// 役割を持つ要素名
    pub role_element: &'static str,
    /// 役割の属性名
    pub role_attribute: &'static str,
    /// membership要素内のグループIDのパス
    pub membership_group_id: &'static [&'static str],
    /// membership要素内のメンバーIDのパス
    pub membership_member_id: &'static [&'static str],
    /// 生徒を示す役割値（小文字）
    pub student_roles: &'static [&'static str],
    /// 教員・職員を示す役割値（小文字）
    pub teacher_roles: &'static [&'static str],
}

const IMS_V1_PERSON_FIELDS: &[(&[&str], SourceField)] = &[
    (&["sourcedid", "id"], SourceField::Reference),
    (&["name", "n", "given"], SourceField::Given),
    (&["name", "n", "family"], SourceField::Family),
    (&["name", "fn"], SourceField::FullName),
    (&["email"], SourceField::Email),
];

impl SchemaMapping {
    /// SchILD NRWのIMS Enterprise形式エクスポート
    pub const fn schild_ims_v1() -> Self {
        Self {
            version: "schild-ims-1",
            root: "enterprise",
            person: "person",
            membership: "membership",
            person_fields: IMS_V1_PERSON_FIELDS,
            role_element: "institutionrole",
            role_attribute: "institutionroletype",
            membership_group_id: &["sourcedid", "id"],
            membership_member_id: &["member", "sourcedid", "id"],
            student_roles: &["student"],
            teacher_roles: &["faculty", "teacher", "staff", "extern"],
        }
    }

    /// person要素からの相対パスに対応するフィールド
    pub fn person_field(&self, path: &[String]) -> Option<SourceField> {
        self.person_fields
            .iter()
            .find(|(field_path, _)| path_eq(field_path, path))
            .map(|(_, field)| *field)
    }

    /// 役割値の一覧とメールアドレスの有無から役割を判定
    ///
    /// 生徒の役割が1つでもあれば生徒、教員系の役割があれば教員、
    /// どちらもなくメールアドレスがあれば教員として扱います。
    pub fn classify(&self, roles: &[String], has_email: bool) -> Option<Role> {
        let normalized: Vec<String> = roles.iter().map(|r| r.trim().to_lowercase()).collect();

        if normalized
            .iter()
            .any(|r| self.student_roles.contains(&r.as_str()))
        {
            return Some(Role::Student);
        }
        if normalized
            .iter()
            .any(|r| self.teacher_roles.contains(&r.as_str()))
            || has_email
        {
            return Some(Role::Teacher);
        }
        None
    }
}

impl Default for SchemaMapping {
    fn default() -> Self {
        Self::schild_ims_v1()
    }
}

pub(crate) fn path_eq(expected: &[&str], actual: &[String]) -> bool {
    expected.len() == actual.len() && expected.iter().zip(actual).all(|(e, a)| *e == a.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_person_field_lookup() {
        let mapping = SchemaMapping::schild_ims_v1();
        assert_eq!(
            mapping.person_field(&path(&["name", "n", "given"])),
            Some(SourceField::Given)
        );
        assert_eq!(
            mapping.person_field(&path(&["sourcedid", "id"])),
            Some(SourceField::Reference)
        );
        assert_eq!(mapping.person_field(&path(&["sourcedid", "source"])), None);
        assert_eq!(mapping.person_field(&path(&["name"])), None);
    }

    #[test]
    fn test_classify_student_wins() {
        let mapping = SchemaMapping::schild_ims_v1();
        let roles = vec!["Faculty".to_string(), "Student".to_string()];
        assert_eq!(mapping.classify(&roles, false), Some(Role::Student));
    }

    #[test]
    fn test_classify_teacher_roles() {
        let mapping = SchemaMapping::schild_ims_v1();
        for role in ["faculty", "Extern", "STAFF", "teacher"] {
            assert_eq!(
                mapping.classify(&[role.to_string()], false),
                Some(Role::Teacher)
            );
        }
    }

    #[test]
    fn test_classify_email_fallback() {
        let mapping = SchemaMapping::schild_ims_v1();
        assert_eq!(mapping.classify(&[], true), Some(Role::Teacher));
        assert_eq!(mapping.classify(&["Alumni".to_string()], false), None);
    }
}
