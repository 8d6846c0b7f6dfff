//! Integration tests for the process-wide message set

use strainer_i18n::*;

#[test]
fn test_global_messages_seed_new_translators() {
    let snapshot = global_messages();

    add_global_messages([("required", "{field} cannot be blank")]);
    let translator = Translator::new();
    assert_eq!(translator.message("required", "title", &[]), "title cannot be blank");

    // translators keep their own copy
    add_global_messages([("required", "changed again")]);
    assert_eq!(translator.message("required", "title", &[]), "title cannot be blank");

    reset_global_messages();
    assert_eq!(
        Translator::new().message("required", "title", &[]),
        "title is required and must not be empty"
    );

    restore_global_messages(snapshot);
}

#[test]
fn test_translator_reset_leaves_global_set_alone() {
    let mut translator = Translator::new();
    translator.add_message("isEmail", "bad mail");
    translator.reset();

    assert!(!global_messages().is_empty());
    assert_eq!(
        translator.message("isEmail", "contact", &[]),
        "contact value must be a valid email address"
    );
}
