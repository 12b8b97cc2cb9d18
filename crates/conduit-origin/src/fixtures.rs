//! Canned search results and the sample property used by the chat client.

use serde_json::{json, Map, Value};

use conduit_core::ResultPayload;

fn school(name: &str, rating: f64, distance: &str, grade: &str) -> Value {
    json!({ "name": name, "rating": rating, "distance": distance, "grade": grade })
}

#[allow(clippy::too_many_arguments)]
fn property(
    id: &str,
    address: &str,
    price: u64,
    bedrooms: u32,
    bathrooms: Value,
    square_feet: u32,
    year_built: u32,
    property_type: &str,
    schools: Vec<Value>,
) -> Value {
    json!({
        "id": id,
        "address": address,
        "price": price,
        "bedrooms": bedrooms,
        "bathrooms": bathrooms,
        "square_feet": square_feet,
        "year_built": year_built,
        "property_type": property_type,
        "schools": schools,
    })
}

fn landmark(name: &str, distance: &str, kind: &str) -> Value {
    json!({ "name": name, "distance": distance, "type": kind })
}

/// Six San Francisco listings and four landmarks.
pub fn search_results() -> ResultPayload {
    let properties = vec![
        property(
            "1",
            "123 Main Street, San Francisco, CA 94102",
            850_000,
            3,
            json!(2),
            1850,
            2015,
            "Condo",
            vec![
                school("Lincoln High School", 8.5, "0.3 miles", "9-12"),
                school("Roosevelt Elementary", 9.2, "0.5 miles", "K-5"),
                school("Washington Middle School", 8.8, "0.7 miles", "6-8"),
            ],
        ),
        property(
            "2",
            "456 Oak Avenue, San Francisco, CA 94103",
            1_200_000,
            4,
            json!(3),
            2400,
            2018,
            "Townhouse",
            vec![
                school("Jefferson High School", 9.1, "0.4 miles", "9-12"),
                school("Madison Elementary", 9.5, "0.3 miles", "K-5"),
                school("Adams Middle School", 9.0, "0.6 miles", "6-8"),
                school("Stanford University", 9.8, "2.5 miles", "University"),
            ],
        ),
        property(
            "3",
            "789 Pine Road, San Francisco, CA 94104",
            650_000,
            2,
            json!(1),
            1200,
            2010,
            "Apartment",
            vec![
                school("Hamilton High School", 8.2, "0.8 miles", "9-12"),
                school("Franklin Elementary", 8.7, "1.0 miles", "K-5"),
            ],
        ),
        property(
            "4",
            "321 Elm Street, San Francisco, CA 94105",
            950_000,
            3,
            json!(2.5),
            2100,
            2019,
            "Single Family",
            vec![
                school("Monroe High School", 9.3, "0.2 miles", "9-12"),
                school("Jackson Elementary", 9.4, "0.4 miles", "K-5"),
                school("Van Buren Middle School", 9.1, "0.5 miles", "6-8"),
                school("UC Berkeley Extension", 9.6, "3.0 miles", "University"),
            ],
        ),
        property(
            "5",
            "654 Maple Drive, San Francisco, CA 94106",
            750_000,
            2,
            json!(2),
            1500,
            2016,
            "Condo",
            vec![
                school("Harrison High School", 8.9, "0.6 miles", "9-12"),
                school("Tyler Elementary", 8.5, "0.7 miles", "K-5"),
            ],
        ),
        property(
            "6",
            "987 Cedar Lane, San Francisco, CA 94107",
            1_100_000,
            5,
            json!(4),
            3200,
            2020,
            "Single Family",
            vec![
                school("Polk High School", 9.5, "0.3 miles", "9-12"),
                school("Taylor Elementary", 9.7, "0.2 miles", "K-5"),
                school("Fillmore Middle School", 9.4, "0.4 miles", "6-8"),
                school("San Francisco State University", 9.2, "4.2 miles", "University"),
            ],
        ),
    ];

    let landmarks = vec![
        landmark("Golden Gate Park", "1.2 miles", "Park"),
        landmark("Union Square", "0.8 miles", "Shopping"),
        landmark("Fisherman's Wharf", "2.1 miles", "Attraction"),
        landmark("Chinatown", "1.5 miles", "Neighborhood"),
    ];

    ResultPayload::new(properties, landmarks)
}

/// The listing the `chat` command asks about.
pub fn sample_property() -> Map<String, Value> {
    let value = property(
        "123",
        "123 Main Street, San Francisco, CA",
        500_000,
        3,
        json!(2),
        1500,
        2015,
        "Condo",
        vec![
            school("Lincoln High School", 8.5, "0.3 miles", "9-12"),
            school("Roosevelt Elementary", 9.2, "0.5 miles", "K-5"),
            school("Washington Middle School", 8.8, "0.7 miles", "6-8"),
            school("Stanford University", 9.8, "15 miles", "University"),
        ],
    );
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
