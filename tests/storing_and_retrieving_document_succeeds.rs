mod common;

use common::FakeExist;
use existdb::{ClientError, XmlNode, XotNode};

#[test]
fn test_storing_and_retrieving_document_succeeds() -> Result<(), ClientError> {
    let exist = FakeExist::new().with_asset("/db/manifests/dada_manifest.xml", "dada_manifest.xml");
    let client = common::client(&exist, "/db/manifests");
    let node = XotNode::parse(r#"<manifest lang="de"><head>Richard Huelsenbeck</head></manifest>"#)?;
    let expected = node.serialize()?;

    let stored = client.store(node, "new.xml")?;
    assert_eq!("/db/manifests/new.xml", stored.document_path());
    assert!(client.exists("new.xml")?);

    let retrieved = client.retrieve_document("new.xml")?;
    assert_eq!(expected, retrieved.node().unwrap().serialize()?);
    assert_eq!(expected, retrieved.to_string());
    assert_eq!(
        Some("http://localhost:8080/exist/rest/db/manifests/new.xml"),
        retrieved.node().unwrap().source_url()
    );
    Ok(())
}
