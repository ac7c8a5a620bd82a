mod common;

use amr_predict::predict::{encode, ObservationInput};
use common::{entry, mapping, Constant};
use proptest::prelude::*;

const KNOWN_COLUMNS: [&str; 6] = [
    "species_Escherichia coli",
    "species_Klebsiella pneumoniae",
    "country_Kenya",
    "country_Uganda",
    "gender_Female",
    "gender_Male",
];

/// Distinct column names, some known to the mapping and some not
fn expected_columns() -> impl Strategy<Value = Vec<String>> {
    let known = proptest::sample::subsequence(KNOWN_COLUMNS.to_vec(), 0..=KNOWN_COLUMNS.len());
    let unknown = proptest::collection::btree_set("zz[a-z]{3,6}_[A-Z][a-z]{2,6}", 0..4);

    (known, unknown)
        .prop_map(|(known, unknown)| {
            known
                .into_iter()
                .map(str::to_string)
                .chain(unknown)
                .collect::<Vec<String>>()
        })
        .prop_shuffle()
}

fn observation() -> impl Strategy<Value = ObservationInput> {
    let species = prop_oneof![
        Just("Escherichia coli".to_string()),
        Just("Klebsiella pneumoniae".to_string()),
        "[A-Z][a-z]{3,8}",
    ];
    let country = prop_oneof![
        Just("Kenya".to_string()),
        Just("Uganda".to_string()),
        "[A-Z][a-z]{3,8}",
    ];

    (
        proptest::option::of(species),
        proptest::option::of(country),
        proptest::option::of(prop_oneof![Just("Female"), Just("Male")]),
    )
        .prop_map(|(species, country, gender)| {
            let mut input = ObservationInput::new();
            if let Some(species) = species {
                input = input.with("species", species);
            }
            if let Some(country) = country {
                input = input.with("country", country);
            }
            if let Some(gender) = gender {
                input = input.with("gender", gender);
            }
            input
        })
}

proptest! {
    #[test]
    fn row_has_exactly_the_expected_columns(columns in expected_columns(), input in observation()) {
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        let entry = entry("amoxicillin", Box::new(Constant { width: names.len(), class: 0 }), &names);

        let row = encode(&input, &mapping(), &entry);

        prop_assert_eq!(row.len(), columns.len());
        prop_assert_eq!(row.columns(), columns.as_slice());
        prop_assert_eq!(row.as_matrix().dim(), (1, columns.len()));
    }

    #[test]
    fn columns_not_set_by_the_input_are_zero(columns in expected_columns(), input in observation()) {
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        let entry = entry("amoxicillin", Box::new(Constant { width: names.len(), class: 0 }), &names);
        let mapping = mapping();

        let row = encode(&input, &mapping, &entry);

        for (column, value) in row.iter() {
            let set_by_input = input
                .categories()
                .filter_map(|(field, raw)| mapping.lookup(field, raw))
                .any(|weights| weights.contains_key(column));
            if set_by_input {
                prop_assert_eq!(value, 1.0);
            } else {
                prop_assert_eq!(value, 0.0);
            }
        }
    }

    #[test]
    fn unmapped_fields_do_not_change_the_row(
        columns in expected_columns(),
        input in observation(),
        extra in proptest::collection::vec(("[a-z]{4,10}_x", "[a-z]{1,8}"), 1..4),
    ) {
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        let entry = entry("amoxicillin", Box::new(Constant { width: names.len(), class: 0 }), &names);
        let mapping = mapping();

        let before = encode(&input, &mapping, &entry).values().clone();
        let widened = extra
            .into_iter()
            .fold(input, |input, (field, value)| input.with(field, value));
        let after = encode(&widened, &mapping, &entry).values().clone();

        prop_assert_eq!(before, after);
    }
}
