//! Apple Wallet passes
//!
//! A `.pkpass` is a zip holding `pass.json`, image assets, a `manifest.json`
//! with the SHA-1 of every file, and `signature`, a detached PKCS#7 over the
//! manifest made with the pass type certificate and Apple's WWDR intermediate.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;
use serde::Serialize;
use serde_json::Value;
use shared::loyalty::RewardRules;
use shared::models::{Customer, GiftCard};
use shared::util::format_cents;
use zip::write::SimpleFileOptions;

use crate::config::AppleConfig;
use crate::error::BoxError;

pub const PKPASS_CONTENT_TYPE: &str = "application/vnd.apple.pkpass";

/// Static pass attributes shared by every pass this service issues.
#[derive(Debug, Clone)]
pub struct PassIdentity {
    pub pass_type_identifier: String,
    pub team_identifier: String,
    pub organization_name: String,
    pub web_service_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pass {
    pub format_version: u8,
    pub pass_type_identifier: String,
    pub serial_number: String,
    pub team_identifier: String,
    pub organization_name: String,
    pub description: String,
    pub logo_text: String,
    #[serde(rename = "webServiceURL")]
    pub web_service_url: String,
    pub authentication_token: String,
    pub foreground_color: String,
    pub background_color: String,
    pub label_color: String,
    pub barcodes: Vec<Barcode>,
    pub store_card: StoreCard,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub voided: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Barcode {
    pub format: &'static str,
    pub message: String,
    pub message_encoding: &'static str,
    pub alt_text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCard {
    pub primary_fields: Vec<PassField>,
    pub secondary_fields: Vec<PassField>,
    pub auxiliary_fields: Vec<PassField>,
    pub back_fields: Vec<PassField>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassField {
    pub key: &'static str,
    pub label: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_message: Option<String>,
}

impl PassField {
    fn new(key: &'static str, label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key,
            label: label.into(),
            value: value.into(),
            change_message: None,
        }
    }

    fn announce(mut self, message: &str) -> Self {
        self.change_message = Some(message.to_string());
        self
    }
}

/// Builds `pass.json` documents for loyalty and gift card passes.
pub struct PassBuilder<'a> {
    identity: &'a PassIdentity,
}

impl<'a> PassBuilder<'a> {
    pub fn new(identity: &'a PassIdentity) -> Self {
        Self { identity }
    }

    fn base(&self, serial_number: String, authentication_token: &str, description: String) -> Pass {
        Pass {
            format_version: 1,
            pass_type_identifier: self.identity.pass_type_identifier.clone(),
            team_identifier: self.identity.team_identifier.clone(),
            organization_name: self.identity.organization_name.clone(),
            logo_text: self.identity.organization_name.clone(),
            web_service_url: self.identity.web_service_url.clone(),
            authentication_token: authentication_token.to_string(),
            description,
            barcodes: vec![Barcode {
                format: "PKBarcodeFormatQR",
                message: serial_number.clone(),
                message_encoding: "iso-8859-1",
                alt_text: serial_number.clone(),
            }],
            serial_number,
            foreground_color: "rgb(255, 255, 255)".into(),
            background_color: "rgb(111, 78, 55)".into(),
            label_color: "rgb(236, 224, 209)".into(),
            store_card: StoreCard::default(),
            voided: false,
        }
    }

    /// Stamp card of one customer.
    pub fn loyalty(&self, customer: &Customer, rules: &RewardRules, auth_token: &str) -> Pass {
        let mut pass = self.base(
            customer.pass_serial(),
            auth_token,
            format!("{} loyalty card", self.identity.organization_name),
        );
        let member_since = chrono::DateTime::from_timestamp_millis(customer.created_at)
            .map(|dt| dt.format("%b %Y").to_string())
            .unwrap_or_default();

        pass.store_card = StoreCard {
            primary_fields: vec![
                PassField::new("points", "STAMPS", customer.points_balance)
                    .announce("You now have %@ stamps"),
            ],
            secondary_fields: vec![
                PassField::new("rewards", "REWARDS", rules.progress_text(customer.points_balance))
                    .announce("%@"),
            ],
            auxiliary_fields: vec![PassField::new(
                "member",
                "MEMBER",
                customer.full_name.clone(),
            )],
            back_fields: vec![
                PassField::new("member_since", "Member since", member_since),
                PassField::new("lifetime", "Lifetime stamps", customer.lifetime_points),
                PassField::new(
                    "terms",
                    "How it works",
                    rules.terms_text(),
                ),
            ],
        };
        pass
    }

    /// Gift card pass. Deactivated cards are voided.
    pub fn gift_card(&self, card: &GiftCard) -> Pass {
        let mut pass = self.base(
            card.pass_serial(),
            &card.pass_auth_token,
            format!("{} gift card", self.identity.organization_name),
        );
        pass.barcodes[0].message = card.serial_number.clone();
        pass.barcodes[0].alt_text = card.serial_number.clone();

        let mut back_fields = Vec::new();
        if let Some(message) = card.message.as_deref().filter(|m| !m.is_empty()) {
            back_fields.push(PassField::new("message", "Message", message));
        }
        back_fields.push(PassField::new(
            "initial",
            "Original value",
            format_cents(card.initial_balance),
        ));

        pass.store_card = StoreCard {
            primary_fields: vec![
                PassField::new("balance", "BALANCE", format_cents(card.balance))
                    .announce("Your balance is now %@"),
            ],
            secondary_fields: vec![PassField::new(
                "serial",
                "CARD NUMBER",
                card.serial_number.clone(),
            )],
            auxiliary_fields: Vec::new(),
            back_fields,
        };
        pass.voided = !card.is_active;
        pass
    }
}

/// SHA-1 hex digest of every file, keyed by file name.
pub fn manifest(files: &[(String, Vec<u8>)]) -> BTreeMap<String, String> {
    files
        .iter()
        .map(|(name, data)| (name.clone(), hex::encode(openssl::sha::sha1(data))))
        .collect()
}

fn write_zip(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, BoxError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in files {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }
        zip.finish()?;
    }
    Ok(buf.into_inner())
}

/// Signing material plus image assets, loaded once at start-up.
pub struct PassSigner {
    certificate: X509,
    key: PKey<Private>,
    chain: Stack<X509>,
    assets: Vec<(String, Vec<u8>)>,
}

impl PassSigner {
    pub fn new(
        certificate: X509,
        key: PKey<Private>,
        wwdr: X509,
        assets: Vec<(String, Vec<u8>)>,
    ) -> Result<Self, BoxError> {
        let mut chain = Stack::new()?;
        chain.push(wwdr)?;
        Ok(Self {
            certificate,
            key,
            chain,
            assets,
        })
    }

    pub fn load(config: &AppleConfig) -> Result<Self, BoxError> {
        let certificate = X509::from_pem(&std::fs::read(&config.cert_path)?)?;
        let wwdr = X509::from_pem(&std::fs::read(&config.wwdr_cert_path)?)?;
        let key_pem = std::fs::read(&config.key_path)?;
        let key = match &config.key_password {
            Some(password) => PKey::private_key_from_pem_passphrase(&key_pem, password.as_bytes())?,
            None => PKey::private_key_from_pem(&key_pem)?,
        };

        let mut assets = Vec::new();
        if let Some(dir) = &config.assets_dir {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "png")
                    && let Some(name) = path.file_name().and_then(|n| n.to_str())
                {
                    assets.push((name.to_string(), std::fs::read(&path)?));
                }
            }
            assets.sort_by(|a, b| a.0.cmp(&b.0));
        }
        if !assets.iter().any(|(name, _)| name == "icon.png") {
            tracing::warn!("No icon.png in pass assets, Wallet will reject generated passes");
        }

        Self::new(certificate, key, wwdr, assets)
    }

    /// Detached DER PKCS#7 signature over `manifest.json`.
    pub fn sign(&self, manifest_json: &[u8]) -> Result<Vec<u8>, BoxError> {
        let flags = Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY;
        let pkcs7 = Pkcs7::sign(&self.certificate, &self.key, &self.chain, manifest_json, flags)?;
        Ok(pkcs7.to_der()?)
    }

    /// Produce the signed `.pkpass` archive.
    pub fn package(&self, pass: &Pass) -> Result<Vec<u8>, BoxError> {
        let mut files = vec![("pass.json".to_string(), serde_json::to_vec(pass)?)];
        files.extend(self.assets.iter().cloned());

        let manifest_json = serde_json::to_vec(&manifest(&files))?;
        let signature = self.sign(&manifest_json)?;
        files.push(("manifest.json".to_string(), manifest_json));
        files.push(("signature".to_string(), signature));

        write_zip(&files)
    }
}

/// Configured Apple Wallet issuer: pass attributes plus signing material.
pub struct AppleWallet {
    pub identity: PassIdentity,
    signer: PassSigner,
}

impl AppleWallet {
    pub fn load(
        config: &AppleConfig,
        organization_name: &str,
        web_service_url: String,
    ) -> Result<Self, BoxError> {
        Ok(Self {
            identity: PassIdentity {
                pass_type_identifier: config.pass_type_identifier.clone(),
                team_identifier: config.team_identifier.clone(),
                organization_name: organization_name.to_string(),
                web_service_url,
            },
            signer: PassSigner::load(config)?,
        })
    }

    pub fn pass_type_identifier(&self) -> &str {
        &self.identity.pass_type_identifier
    }

    pub fn loyalty_pkpass(
        &self,
        customer: &Customer,
        rules: &RewardRules,
        auth_token: &str,
    ) -> Result<Vec<u8>, BoxError> {
        let pass = PassBuilder::new(&self.identity).loyalty(customer, rules, auth_token);
        self.signer.package(&pass)
    }

    pub fn gift_card_pkpass(&self, card: &GiftCard) -> Result<Vec<u8>, BoxError> {
        let pass = PassBuilder::new(&self.identity).gift_card(card);
        self.signer.package(&pass)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::self_signed;
    use std::io::Read;
    use uuid::Uuid;

    fn identity() -> PassIdentity {
        PassIdentity {
            pass_type_identifier: "pass.com.example.coffee".into(),
            team_identifier: "ABCDE12345".into(),
            organization_name: "Corner Coffee".into(),
            web_service_url: "https://api.example.com/api/passkit".into(),
        }
    }

    fn customer(balance: i64) -> Customer {
        Customer {
            id: Uuid::nil(),
            email: "ann@example.com".into(),
            full_name: "Ann Lee".into(),
            points_balance: balance,
            lifetime_points: 42,
            total_purchases: 40,
            rewards_redeemed: 3,
            created_at: 1_704_067_200_000,
            updated_at: 1_704_067_200_000,
        }
    }

    fn gift_card() -> GiftCard {
        GiftCard {
            id: Uuid::nil(),
            serial_number: "7KQF-M2XD-9RTA".into(),
            initial_balance: 5_000,
            balance: 1_234,
            purchaser_email: None,
            recipient_email: None,
            message: Some("Enjoy!".into()),
            claim_token: "claim".into(),
            claimed_by: None,
            claimed_at: None,
            pass_auth_token: "gift-auth-token".into(),
            issued_by: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn field<'a>(fields: &'a [PassField], key: &str) -> &'a PassField {
        fields.iter().find(|f| f.key == key).unwrap()
    }

    #[test]
    fn test_loyalty_field_mapping() {
        let id = identity();
        let pass = PassBuilder::new(&id).loyalty(&customer(13), &RewardRules::default(), "tok");
        assert_eq!(pass.serial_number, format!("L-{}", Uuid::nil()));
        assert_eq!(pass.authentication_token, "tok");
        assert_eq!(pass.barcodes[0].message, pass.serial_number);

        let card = &pass.store_card;
        assert_eq!(field(&card.primary_fields, "points").value, Value::from(13));
        assert_eq!(
            field(&card.secondary_fields, "rewards").value,
            Value::from("Free drink ready!")
        );
        assert_eq!(field(&card.auxiliary_fields, "member").value, Value::from("Ann Lee"));
        assert_eq!(
            field(&card.back_fields, "member_since").value,
            Value::from("Jan 2024")
        );
        assert_eq!(field(&card.back_fields, "lifetime").value, Value::from(42));
    }

    #[test]
    fn test_loyalty_pass_json_shape() {
        let id = identity();
        let pass = PassBuilder::new(&id).loyalty(&customer(3), &RewardRules::default(), "tok");
        let json = serde_json::to_value(&pass).unwrap();
        assert_eq!(json["formatVersion"], 1);
        assert_eq!(json["passTypeIdentifier"], "pass.com.example.coffee");
        assert_eq!(json["webServiceURL"], "https://api.example.com/api/passkit");
        assert!(json.get("webServiceUrl").is_none());
        assert_eq!(
            json["storeCard"]["secondaryFields"][0]["value"],
            "7 more stamps until your free drink"
        );
        assert!(json.get("voided").is_none());
    }

    #[test]
    fn test_gift_card_field_mapping() {
        let id = identity();
        let mut card = gift_card();
        let pass = PassBuilder::new(&id).gift_card(&card);
        assert_eq!(pass.serial_number, "G-7KQF-M2XD-9RTA");
        assert_eq!(pass.authentication_token, "gift-auth-token");
        assert_eq!(pass.barcodes[0].message, "7KQF-M2XD-9RTA");
        assert_eq!(
            field(&pass.store_card.primary_fields, "balance").value,
            Value::from("$12.34")
        );
        assert_eq!(
            field(&pass.store_card.secondary_fields, "serial").value,
            Value::from("7KQF-M2XD-9RTA")
        );
        assert_eq!(
            field(&pass.store_card.back_fields, "message").value,
            Value::from("Enjoy!")
        );
        assert!(!pass.voided);

        card.is_active = false;
        card.message = None;
        let voided = PassBuilder::new(&id).gift_card(&card);
        assert!(voided.voided);
        assert!(voided.store_card.back_fields.iter().all(|f| f.key != "message"));
    }

    #[test]
    fn test_manifest_hashes() {
        let files = vec![("pass.json".to_string(), b"abc".to_vec())];
        let manifest = manifest(&files);
        assert_eq!(
            manifest["pass.json"],
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_package_contains_signed_manifest() {
        let (cert, key) = self_signed();
        let signer = PassSigner::new(
            cert.clone(),
            key,
            cert,
            vec![("icon.png".to_string(), vec![0x89, b'P', b'N', b'G'])],
        )
        .unwrap();

        let id = identity();
        let pass = PassBuilder::new(&id).gift_card(&gift_card());
        let bytes = signer.package(&pass).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, ["icon.png", "manifest.json", "pass.json", "signature"]);

        let mut manifest_json = Vec::new();
        archive
            .by_name("manifest.json")
            .unwrap()
            .read_to_end(&mut manifest_json)
            .unwrap();
        let manifest: BTreeMap<String, String> = serde_json::from_slice(&manifest_json).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains_key("icon.png"));

        let mut signature = Vec::new();
        archive
            .by_name("signature")
            .unwrap()
            .read_to_end(&mut signature)
            .unwrap();
        assert!(Pkcs7::from_der(&signature).is_ok());
    }
}
