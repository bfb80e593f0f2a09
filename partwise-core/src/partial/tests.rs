use std::collections::HashSet;

use partwise_testhelpers::test;

use crate::{FieldId, FieldNotSet, PartialRecord, Record, record};

record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Name {
        required FIRST => first: String,
        required LAST => last: String,
        optional MIDDLE => middle: String,
    }
}

record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        required NAME => name: Name,
        required AGE => age: u32,
        optional ALIAS => alias: Name,
    }
}

fn ada() -> Name {
    Name {
        first: "Ada".into(),
        last: "Lovelace".into(),
        middle: None,
    }
}

#[test]
fn unset_field_is_not_set() {
    let partial = PartialRecord::<Name>::new();
    assert_eq!(partial.value(Name::FIRST), Err(FieldNotSet::new(Name::FIRST)));
    assert!(!partial.contains(Name::FIRST));
    assert!(!partial.is_complete());
    assert!(partial.is_empty());
}

#[test]
fn set_then_read_back() {
    let mut partial = PartialRecord::<Name>::new();
    partial.set(Name::FIRST, "Ada".to_string());
    assert_eq!(partial.value(Name::FIRST)?, "Ada");

    let previous = partial.replace(Name::FIRST, "Augusta".to_string());
    assert_eq!(previous.as_deref(), Some("Ada"));
    assert_eq!(partial.value(Name::FIRST)?, "Augusta");
    assert_eq!(partial.len(), 1);
}

#[test]
fn remove_unsets_the_field() {
    let mut partial = PartialRecord::<Name>::new();
    partial.set(Name::LAST, "Lovelace".to_string());

    assert_eq!(partial.remove(Name::LAST).as_deref(), Some("Lovelace"));
    assert_eq!(partial.value(Name::LAST), Err(FieldNotSet::new(Name::LAST)));

    // removing again is a no-op
    assert_eq!(partial.remove(Name::LAST), None);
    assert!(partial.is_empty());
}

#[test]
fn explicit_none_differs_from_unset() {
    let mut partial = PartialRecord::<Name>::new();
    assert!(partial.value(Name::MIDDLE).is_err());
    assert_eq!(partial.optional(Name::MIDDLE), None);

    partial.set(Name::MIDDLE, None);
    assert_eq!(partial.value(Name::MIDDLE)?, &None);
    assert!(partial.contains(Name::MIDDLE));
    assert_eq!(partial.optional(Name::MIDDLE), None);

    partial.set(Name::MIDDLE, Some("King".to_string()));
    assert_eq!(partial.optional(Name::MIDDLE).map(String::as_str), Some("King"));
}

#[test]
fn optional_fields_do_not_block_completeness() {
    let mut partial = PartialRecord::<Name>::new();
    partial
        .set(Name::FIRST, "Ada".to_string())
        .set(Name::LAST, "Lovelace".to_string());

    assert!(partial.is_complete());
    assert_eq!(partial.build()?, ada());
}

#[test]
fn build_reports_first_missing_field_in_declared_order() {
    let mut partial = PartialRecord::<Name>::new();
    assert_eq!(partial.build().unwrap_err().field(), Name::FIRST);

    partial.set(Name::LAST, "Lovelace".to_string());
    assert_eq!(partial.build().unwrap_err().field(), Name::FIRST);

    partial.remove(Name::LAST);
    partial.set(Name::FIRST, "Ada".to_string());
    assert_eq!(partial.build().unwrap_err().field(), Name::LAST);

    let missing: Vec<FieldId> = PartialRecord::<Person>::new().missing_fields().collect();
    assert_eq!(missing, vec![Person::NAME.id(), Person::AGE.id()]);
}

#[test]
fn build_leaves_the_partial_alone() {
    let mut partial = PartialRecord::<Name>::new();
    partial
        .set(Name::FIRST, "Ada".to_string())
        .set(Name::LAST, "Lovelace".to_string());

    let first = partial.build()?;
    let second = partial.build()?;
    assert_eq!(first, second);
    assert_eq!(partial.len(), 2);
}

#[test]
fn rewrapping_a_built_record_round_trips() {
    let name = Name {
        middle: Some("King".into()),
        ..ada()
    };
    let partial = PartialRecord::from_record(name.clone());
    assert!(partial.is_complete());
    assert_eq!(partial.len(), 3);
    assert_eq!(partial.build()?, name);

    // every field is set, including optional ones that hold `None`
    let partial = PartialRecord::from(ada());
    assert_eq!(partial.value(Name::MIDDLE)?, &None);
}

#[test]
fn set_from_incomplete_nested_reports_nested_field() {
    let mut name = PartialRecord::<Name>::new();
    name.set(Name::FIRST, "Ada".to_string());

    let mut person = PartialRecord::<Person>::new();
    let err = person.set_from_nested(Person::NAME, &name).unwrap_err();

    assert_eq!(err, FieldNotSet::new(Name::LAST));
    assert!(err.field().belongs_to::<Name>());
    assert!(!err.field().belongs_to::<Person>());
    assert!(person.is_empty());
}

#[test]
fn set_from_complete_nested() {
    let mut person = PartialRecord::<Person>::new();
    person
        .set_from_nested(Person::NAME, &PartialRecord::from(ada()))?
        .set(Person::AGE, 36);

    let built = person.build()?;
    assert_eq!(built.name, ada());
    assert_eq!(built.alias, None);

    person.set_from_nested_optional(Person::ALIAS, &PartialRecord::from(ada()))?;
    assert_eq!(person.optional(Person::ALIAS), Some(&ada()));
}

#[test]
fn merge_copies_present_fields_only() {
    let mut base = PartialRecord::<Name>::new();
    base.set(Name::FIRST, "Ada".to_string())
        .set(Name::MIDDLE, Some("King".to_string()));

    let mut patch = PartialRecord::<Name>::new();
    patch
        .set(Name::FIRST, "Augusta".to_string())
        .set(Name::LAST, "Byron".to_string());

    base.merge(&patch);
    assert_eq!(base.value(Name::FIRST)?, "Augusta");
    assert_eq!(base.value(Name::LAST)?, "Byron");
    assert_eq!(base.optional(Name::MIDDLE).map(String::as_str), Some("King"));

    // the merged values are copies
    patch.set(Name::LAST, "Lovelace".to_string());
    assert_eq!(base.value(Name::LAST)?, "Byron");
}

#[test]
fn clones_do_not_share_storage() {
    let mut original = PartialRecord::<Name>::new();
    original.set(Name::FIRST, "Ada".to_string());

    let mut copy = original.clone();
    assert_eq!(copy, original);

    copy.set(Name::FIRST, "Augusta".to_string());
    assert_eq!(original.value(Name::FIRST)?, "Ada");
    assert_ne!(copy, original);
}

#[test]
fn iter_yields_present_fields_in_declared_order() {
    let mut partial = PartialRecord::<Name>::new();
    partial
        .set(Name::MIDDLE, None)
        .set(Name::FIRST, "Ada".to_string());

    let ids: Vec<FieldId> = partial.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![Name::FIRST.id(), Name::MIDDLE.id()]);

    let (_, first) = partial.iter().next().unwrap();
    assert_eq!(first.downcast_ref::<String>().map(String::as_str), Some("Ada"));

    partial.clear();
    assert!(partial.is_empty());
}

#[test]
fn debug_lists_present_fields() {
    let mut partial = PartialRecord::<Name>::new();
    partial.set(Name::FIRST, "Ada".to_string());
    assert_eq!(format!("{partial:?}"), r#"Name { first: "Ada", .. }"#);

    partial.set(Name::LAST, "Lovelace".to_string());
    assert_eq!(
        format!("{partial:?}"),
        r#"Name { first: "Ada", last: "Lovelace" }"#
    );
}

#[test]
fn field_ids_are_scoped_to_their_record() {
    // same index, different records
    assert_eq!(Name::FIRST.index(), Person::NAME.index());
    assert_ne!(Name::FIRST.id(), Person::NAME.id());

    let ids: HashSet<FieldId> = [Name::FIRST.id(), Name::FIRST.id(), Person::NAME.id()]
        .into_iter()
        .collect();
    assert_eq!(ids.len(), 2);

    assert_eq!(Name::SHAPE.field_named("last"), Some(Name::LAST.id()));
    assert_eq!(Name::SHAPE.field_named("nope"), None);
    assert_eq!(Name::SHAPE.required_fields().count(), 2);
    assert_eq!(Name::LAST.id().to_string(), "Name::last");
    assert!(Name::MIDDLE.field().is_optional());
}

#[test]
fn shape_lists_field_ids_in_declared_order() {
    let ids: Vec<FieldId> = Person::SHAPE.field_ids().collect();
    assert_eq!(ids, vec![Person::NAME.id(), Person::AGE.id(), Person::ALIAS.id()]);
    assert_eq!(Person::SHAPE.field_id(1), Some(Person::AGE.id()));
    assert_eq!(Person::SHAPE.field_id(3), None);

    let missing: Vec<FieldId> = PartialRecord::<Person>::new().missing_fields().collect();
    assert_eq!(missing, vec![Person::NAME.id(), Person::AGE.id()]);
}

// Plain libtest tests: `should_panic` needs a test that returns `()`.
mod panics {
    use super::Name;
    use crate::{FieldKey, PartialRecord};

    #[test]
    #[should_panic(expected = "declared as")]
    fn mistyped_key_panics() {
        let partial = PartialRecord::<Name>::new();
        let wrong: FieldKey<Name, u32> = FieldKey::new(0);
        let _ = partial.value(wrong);
    }
}
