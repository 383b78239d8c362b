use statbank_core::auth::AuthHeader;
use statbank_core::contract::{
    MockCredentialEncryptor, MockPasswordPrompt, MockStatbankApi, RawResponse,
};
use statbank_core::description::describe;
use statbank_core::StatbankError;

const DESCRIPTION: &str = include_str!("fixtures/uttaksbeskrivelse_10000.json");

#[tokio::test]
async fn describe_builds_its_own_header() {
    let expected = AuthHeader::basic("LAST360", "oDwXta3DXdEGYZ/FYIRovw==")
        .as_str()
        .to_string();

    let mut prompt = MockPasswordPrompt::new();
    prompt
        .expect_prompt_password()
        .withf(|user| user == "LAST360")
        .times(1)
        .returning(|_| Ok("coConU7s6".to_string()));
    let mut encryptor = MockCredentialEncryptor::new();
    encryptor
        .expect_encrypt()
        .withf(|pw| pw == "coConU7s6")
        .times(1)
        .returning(|_| Ok("oDwXta3DXdEGYZ/FYIRovw==".to_string()));
    let mut api = MockStatbankApi::new();
    api.expect_get_description()
        .withf(move |auth, table| auth.as_str() == expected && table == "HovedTabellNavn")
        .times(1)
        .returning(|_, _| Ok(RawResponse::new(200, DESCRIPTION)));

    let description = describe(&api, &encryptor, &prompt, "LAST360", "HovedTabellNavn")
        .await
        .unwrap();
    assert_eq!(description.table_id, "10000");
    assert_eq!(description.parts.len(), 2);
}

#[tokio::test]
async fn describe_rejects_short_numeric_id_before_prompting() {
    let mut prompt = MockPasswordPrompt::new();
    prompt.expect_prompt_password().times(0);
    let mut encryptor = MockCredentialEncryptor::new();
    encryptor.expect_encrypt().times(0);
    let mut api = MockStatbankApi::new();
    api.expect_get_description().times(0);

    let err = describe(&api, &encryptor, &prompt, "LAST360", "1000")
        .await
        .unwrap_err();
    assert!(matches!(err, StatbankError::Configuration(_)));
}
