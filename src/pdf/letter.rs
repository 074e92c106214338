//! 文面の組み立て（描画とは独立）

use crate::api::SchoolGroup;
use crate::types::CredentialEntry;

/// 文面の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterOptions {
    /// プラットフォーム名（例: `ANTON`）
    pub branding: String,
    /// 記載するリンク
    pub link: String,
    /// 対象グループ
    pub school_group: SchoolGroup,
    /// サポート連絡先（空なら記載しない）
    pub support_contact: String,
}

impl Default for LetterOptions {
    fn default() -> Self {
        Self {
            branding: "ANTON".to_string(),
            link: "https://www.anton.app".to_string(),
            school_group: SchoolGroup::Students,
            support_contact: String::new(),
        }
    }
}

/// 呼びかけ方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    /// du
    Informal,
    /// Sie
    Formal,
}

/// 1名分の文面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letter {
    pub address: Address,
    pub title: String,
    pub greeting: String,
    pub welcome: String,
    pub account: String,
    pub browser: String,
    pub link: String,
    pub app: String,
    pub login: String,
    pub code: String,
    pub scan: String,
    /// 切り取り用ステッカーの名前欄
    pub sticker_name: String,
    pub support: Option<String>,
}

/// エントリと設定から文面を組み立てる
///
/// 対象グループが教員の場合、またはAnredeが設定されている場合は「Sie」、
/// それ以外は「du」の文面になります。
pub fn compose_letter(entry: &CredentialEntry, options: &LetterOptions) -> Letter {
    let address = if options.school_group == SchoolGroup::Teachers
        || !entry.salutation.trim().is_empty()
    {
        Address::Formal
    } else {
        Address::Informal
    };
    let brand = options.branding.trim();
    let formal = address == Address::Formal;

    let pick = |sie: String, du: String| if formal { sie } else { du };

    let support = Some(options.support_contact.trim())
        .filter(|contact| !contact.is_empty())
        .map(|contact| {
            pick(
                format!("Bei Fragen wenden Sie sich bitte an: {}", contact),
                format!("Bei Fragen wende dich bitte an: {}", contact),
            )
        });

    Letter {
        address,
        title: format!("{}-Zugangsdaten", brand),
        greeting: format!("Hallo {},", entry.display_name()),
        welcome: format!("Willkommen bei {} - der Lern-App für die Schule.", brand),
        account: pick(
            "Für Sie wurde ein Account angelegt.".to_string(),
            "Für dich wurde ein Account angelegt.".to_string(),
        ),
        browser: pick(
            "Gehen Sie im Browser auf".to_string(),
            "Gehe im Browser auf".to_string(),
        ),
        link: options.link.trim().to_string(),
        app: pick(
            format!("oder laden Sie die kostenlose {}-App herunter.", brand),
            format!("oder lade dir die kostenlose {}-App herunter.", brand),
        ),
        login: pick(
            format!("Sie können sich mit folgendem Code bei {} einloggen:", brand),
            format!("Du kannst dich mit folgendem Code bei {} einloggen:", brand),
        ),
        code: entry.login_code.clone(),
        scan: pick(
            format!("Oder Sie scannen in der {}-App diesen QR-Code:", brand),
            format!("Oder du scannst in der {}-App diesen QR-Code:", brand),
        ),
        sticker_name: entry.display_name(),
        support,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anna() -> CredentialEntry {
        CredentialEntry {
            first_name: "Anna Lena".to_string(),
            last_name: "Muster".to_string(),
            class: "5a".to_string(),
            login_code: "ABCD-1234".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_informal_letter_for_students() {
        let letter = compose_letter(&anna(), &LetterOptions::default());

        assert_eq!(letter.address, Address::Informal);
        assert_eq!(letter.greeting, "Hallo Anna Muster,");
        assert_eq!(letter.account, "Für dich wurde ein Account angelegt.");
        assert_eq!(letter.browser, "Gehe im Browser auf");
        assert_eq!(letter.code, "ABCD-1234");
        assert_eq!(letter.support, None);
    }

    #[test]
    fn test_formal_letter_for_salutation() {
        let entry = CredentialEntry {
            salutation: "Frau".to_string(),
            ..anna()
        };
        let letter = compose_letter(&entry, &LetterOptions::default());
        assert_eq!(letter.address, Address::Formal);
        assert_eq!(
            letter.login,
            "Sie können sich mit folgendem Code bei ANTON einloggen:"
        );
    }

    #[test]
    fn test_formal_letter_for_teacher_group() {
        let options = LetterOptions {
            school_group: SchoolGroup::Teachers,
            ..LetterOptions::default()
        };
        let letter = compose_letter(&anna(), &options);
        assert_eq!(letter.address, Address::Formal);
        assert_eq!(letter.scan, "Oder Sie scannen in der ANTON-App diesen QR-Code:");
    }

    #[test]
    fn test_branding_and_support() {
        let options = LetterOptions {
            branding: "Lernplattform".to_string(),
            link: " https://schule.example ".to_string(),
            support_contact: "it@schule.example".to_string(),
            ..LetterOptions::default()
        };
        let letter = compose_letter(&anna(), &options);

        assert_eq!(letter.title, "Lernplattform-Zugangsdaten");
        assert_eq!(letter.link, "https://schule.example");
        assert!(letter.app.contains("Lernplattform-App"));
        assert_eq!(
            letter.support.as_deref(),
            Some("Bei Fragen wende dich bitte an: it@schule.example")
        );
    }
}
