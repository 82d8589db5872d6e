mod util;

use std::net::Ipv4Addr;

use certmint::error::CertMintError;
use certmint::{
    CaMaterial, CertificateConfig, CertificateRole, IssuedCertificate, KeyAlgorithm, issue_ca,
    issue_certificate,
};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509NameBuilder, X509StoreContext};

fn common_name(name: &openssl::x509::X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

fn verify_chain(leaf: &X509, ca: &X509) -> bool {
    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(ca.clone()).unwrap();
    let store = store.build();
    let chain = Stack::new().unwrap();
    let mut context = X509StoreContext::new().unwrap();
    context
        .init(&store, leaf, &chain, |c| c.verify_cert())
        .unwrap()
}

fn ec_key(curve: Nid) -> PKey<Private> {
    let group = EcGroup::from_curve_name(curve).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

/// A self-signed CA built by OpenSSL on a curve certmint does not support.
fn openssl_p521_ca() -> X509 {
    let key = ec_key(Nid::SECP521R1);
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "p521 ca").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(7).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha512()).unwrap();
    builder.build()
}

fn parse(issued: &IssuedCertificate) -> X509 {
    X509::from_pem(issued.certificate_bytes()).expect("Failed to parse PEM")
}

#[test]
fn test_openssl_crate_validate_server_cert() {
    let ca = util::generate_ca();
    let server = util::generate_leaf(
        CertificateRole::ServerCert,
        "server.myca.local",
        &["server.myca.local", "10.1.2.3:443"],
        Some(&ca),
    );

    let ca_x509 = parse(&ca);
    let x509 = parse(&server);

    assert_eq!(common_name(x509.subject_name()), "server.myca.local");
    assert_eq!(common_name(x509.issuer_name()), "myca.local");
    assert_eq!(x509.version(), 2, "X509 version should be 3 (0-based index)");
    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::ECDSA_WITH_SHA256
    );
    assert!(!x509.serial_number().to_bn().unwrap().is_negative());

    let lifetime = x509.not_before().diff(x509.not_after()).unwrap();
    assert_eq!((lifetime.days, lifetime.secs), (365, 0));

    let names = x509.subject_alt_names().expect("server certificate has SANs");
    let dns: Vec<_> = names.iter().filter_map(|n| n.dnsname()).collect();
    let ips: Vec<_> = names.iter().filter_map(|n| n.ipaddress()).collect();
    assert_eq!(dns, vec!["server.myca.local"]);
    assert_eq!(ips, vec![&Ipv4Addr::new(10, 1, 2, 3).octets()[..]]);

    assert!(x509.verify(&ca_x509.public_key().unwrap()).unwrap());
    assert!(verify_chain(&x509, &ca_x509));
}

#[test]
fn test_openssl_crate_validate_client_cert() {
    let ca = util::generate_ca();
    let client = util::generate_leaf(
        CertificateRole::ClientCert,
        "client.myca.local",
        &["ignored.example"],
        Some(&ca),
    );
    let x509 = parse(&client);
    assert!(x509.subject_alt_names().is_none());
    assert!(verify_chain(&x509, &parse(&ca)));
}

#[test]
fn test_openssl_crate_validate_self_signed() {
    let issued = util::generate_leaf(CertificateRole::ServerCert, "self.local", &["self.local"], None);
    let x509 = parse(&issued);
    assert_eq!(common_name(x509.issuer_name()), "self.local");
    assert!(x509.verify(&x509.public_key().unwrap()).unwrap());
}

#[test]
fn test_openssl_reads_private_keys() {
    util::init_logging();
    for algorithm in [
        KeyAlgorithm::Rsa,
        KeyAlgorithm::EcdsaP256,
        KeyAlgorithm::EcdsaP384,
        KeyAlgorithm::Ed25519,
    ] {
        let ca = issue_ca(
            &CertificateConfig::builder()
                .key_algorithm(algorithm)
                .subject(util::subject("keys ca"))
                .build(),
        )
        .unwrap();
        let key = PKey::private_key_from_pem(ca.private_key_bytes()).unwrap();
        assert!(parse(&ca).public_key().unwrap().public_eq(&key));
    }
}

#[test]
fn test_openssl_verifies_rsa_chain() {
    util::init_logging();
    let ca = issue_ca(
        &CertificateConfig::builder()
            .subject(util::subject("rsa ca"))
            .build(),
    )
    .unwrap();
    let server = issue_certificate(
        &CertificateConfig::builder()
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .subject(util::subject("rsa-signed server"))
            .issuer(CaMaterial::from(&ca))
            .build(),
    )
    .unwrap();
    let x509 = parse(&server);
    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::SHA256WITHRSAENCRYPTION
    );
    assert!(verify_chain(&x509, &parse(&ca)));
}

#[test]
fn test_openssl_ca_with_unsupported_key_is_invalid_issuer() {
    util::init_logging();
    let ca = openssl_p521_ca();
    let unrelated_key = ec_key(Nid::X9_62_PRIME256V1)
        .private_key_to_pem_pkcs8()
        .unwrap();
    let config = CertificateConfig::builder()
        .key_algorithm(KeyAlgorithm::EcdsaP256)
        .issuer(CaMaterial::from_bytes(ca.to_pem().unwrap(), unrelated_key))
        .build();
    assert!(matches!(
        issue_certificate(&config),
        Err(CertMintError::InvalidIssuerError(_))
    ));
}
