//! Full client lifecycle against the live mock API.
//!
//! Starts the mock RapidPro server on a random port, then exercises queries,
//! pagination, writes and error handling over real HTTP using the default
//! ureq transport.

use std::time::{Duration, Instant};

use rapidpro_core::{
    ClientError, ContactFilter, ContactPayload, GroupFilter, RapidProClient, UreqTransport,
};

fn start_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: std::net::SocketAddr) -> RapidProClient {
    RapidProClient::with_transport(
        &format!("http://{addr}/api/v2"),
        "1234567890",
        Some("test/0.1"),
        Box::new(UreqTransport::new()),
    )
}

/// Arms the server to answer the next `count` collection GETs with 429.
fn arm_rate_limits(addr: std::net::SocketAddr, count: u32) {
    ureq::post(&format!("http://{addr}/_config/rate_limits"))
        .content_type("application/json")
        .send(count.to_string().as_bytes())
        .expect("arming rate limits failed");
}

#[test]
fn contact_lifecycle() {
    let addr = start_server();
    let client = client(addr);

    // empty database, empty result set
    let contacts = client.get_contacts(ContactFilter::default()).all().unwrap();
    assert!(contacts.is_empty());
    assert_eq!(
        client.get_contacts(ContactFilter::default()).first().unwrap(),
        None
    );

    // a group to file contacts under
    let customers = client.create_group("Customers").unwrap();
    let customers_uuid = customers.string("uuid").unwrap().to_string();
    assert_eq!(customers.string("name"), Some("Customers"));

    // five contacts, two of them in the group; enough for three pages
    for i in 0..5 {
        let payload = ContactPayload {
            name: Some(format!("Contact {i}")),
            urns: Some(vec![format!("tel:+25078812312{i}")]),
            groups: if i < 2 {
                Some(vec![customers_uuid.clone()])
            } else {
                None
            },
            ..Default::default()
        };
        client.create_contact(&payload).unwrap();
    }

    // all() walks every page in server order
    let contacts = client.get_contacts(ContactFilter::default()).all().unwrap();
    let names: Vec<_> = contacts.iter().map(|c| c.string("name").unwrap()).collect();
    assert_eq!(
        names,
        vec!["Contact 0", "Contact 1", "Contact 2", "Contact 3", "Contact 4"]
    );

    // page-by-page iteration sees the same records in 2/2/1 batches
    let mut sizes = Vec::new();
    for page in client.get_contacts(ContactFilter::default()).pages() {
        sizes.push(page.unwrap().len());
    }
    assert_eq!(sizes, vec![2, 2, 1]);

    // group filter narrows the result set
    let filter = ContactFilter {
        group: Some("Customers".to_string()),
        ..Default::default()
    };
    let customers_contacts = client.get_contacts(filter.clone()).all().unwrap();
    assert_eq!(customers_contacts.len(), 2);
    let group = customers_contacts[0].list("groups").unwrap()[0].as_object().unwrap();
    assert_eq!(group.string("name"), Some("Customers"));

    let first = client.get_contacts(filter).first().unwrap().unwrap();
    assert_eq!(first.string("name"), Some("Contact 0"));

    // update one contact by uuid
    let uuid = first.string("uuid").unwrap().to_string();
    let updated = client
        .update_contact(
            &uuid,
            &ContactPayload {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.string("name"), Some("Renamed"));
    // a payload without groups leaves memberships alone
    let group = updated.list("groups").unwrap()[0].as_object().unwrap();
    assert_eq!(group.string("name"), Some("Customers"));

    // delete it, then deleting again is NotFound
    client.delete_contact(&uuid).unwrap();
    let contacts = client.get_contacts(ContactFilter::default()).all().unwrap();
    assert_eq!(contacts.len(), 4);
    let err = client.delete_contact(&uuid).unwrap_err();
    assert!(matches!(err, ClientError::NotFound));

    // update of a missing contact is NotFound too
    let err = client
        .update_contact(&uuid, &ContactPayload::default())
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound));
}

#[test]
fn validation_errors_name_the_field() {
    let addr = start_server();
    let client = client(addr);

    let err = client.create_group("").unwrap_err();
    match err {
        ClientError::Validation(errors) => {
            assert_eq!(
                errors.field("name"),
                Some(&["This field is required.".to_string()][..])
            );
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    // unknown group reference on contact creation
    let err = client
        .create_contact(&ContactPayload {
            name: Some("Joe".to_string()),
            groups: Some(vec!["no-such-group".to_string()]),
            ..Default::default()
        })
        .unwrap_err();
    match err {
        ClientError::Validation(errors) => {
            assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["groups"]);
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn rate_limits_propagate_or_retry_per_policy() {
    let addr = start_server();
    let client = client(addr);
    client.create_group("Reporters").unwrap();

    // without retry the error reaches the caller untouched
    arm_rate_limits(addr, 1);
    let err = client.get_groups(GroupFilter::default()).all().unwrap_err();
    assert!(matches!(err, ClientError::RateLimit { retry_after_secs: 1 }));

    // with retry the cursor waits out the Retry-After and succeeds
    arm_rate_limits(addr, 1);
    let started = Instant::now();
    let groups = client
        .get_groups(GroupFilter::default())
        .with_rate_limit_retry(true)
        .all()
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].string("name"), Some("Reporters"));
}
