//! Blip scenarios: selections, batched edits, thread links and proxies

use serde_json::{json, Value};
use wavekit_editor::document::{names, Content, Element, ElementType, Properties};
use wavekit_editor::{BlipData, EditSession, EditorError, HitValue, Payload, Query, SessionOptions};

const ROOT_BLIP_ID: &str = "b+43";
const CHILD_BLIP_ID: &str = "b+42";

fn blip_data(overrides: Value) -> BlipData {
    let mut data = json!({
        "childBlipIds": [],
        "content": "\nhello world!\nanother line",
        "contributors": ["robot@test.com", "user@test.com"],
        "creator": "user@test.com",
        "lastModifiedTime": 1000,
        "parentBlipId": null,
        "annotations": [{"range": {"start": 2, "end": 3}, "name": "key", "value": "val"}],
        "waveId": "test.com!w+g3h3im",
        "waveletId": "test.com!root+conv",
        "elements": {"14": {"type": "GADGET", "properties": {"url": "http://a/b.xml"}}},
        "blipId": ROOT_BLIP_ID
    });
    if let (Some(base), Some(extra)) = (data.as_object_mut(), overrides.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(data).expect("valid blip data")
}

fn session() -> EditSession {
    EditSession::new(SessionOptions::default()).expect("default options")
}

fn style_ranges(blip: &wavekit_editor::Blip, name: &str) -> Vec<(usize, usize)> {
    blip.document()
        .annotations()
        .get(name)
        .map(|list| list.iter().map(|a| (a.start(), a.end())).collect())
        .unwrap_or_default()
}

#[test]
fn test_blip_properties() -> anyhow::Result<()> {
    let session = session();
    let root = session.load_blip(blip_data(json!({"childBlipIds": [CHILD_BLIP_ID]})))?;
    let child = session.load_blip(blip_data(json!({
        "blipId": CHILD_BLIP_ID,
        "parentBlipId": ROOT_BLIP_ID
    })))?;

    assert_eq!(root.blip_id(), ROOT_BLIP_ID);
    assert_eq!(root.child_blip_ids(), vec![CHILD_BLIP_ID.to_string()]);
    assert_eq!(root.contributors().len(), 2);
    assert_eq!(root.creator().as_deref(), Some("user@test.com"));
    assert_eq!(root.text(), "\nhello world!\nanother line");
    assert_eq!(root.last_modified_time(), 1000);
    assert_eq!(root.wave_id(), "test.com!w+g3h3im");
    assert_eq!(root.wavelet_id(), "test.com!root+conv");

    let gadget = root.at(14).value()?;
    let gadget = gadget.as_element().expect("gadget at 14");
    assert_eq!(gadget.element_type(), &ElementType::Gadget);
    assert_eq!(gadget.get_str("url"), Some("http://a/b.xml"));
    assert_eq!(root.at(3).value()?, HitValue::Text("l".to_string()));

    assert!(root.is_root());
    assert!(!child.is_root());
    assert_eq!(child.parent_blip(), Some(root.clone()));
    assert_eq!(root.child_blips(), vec![child]);
    Ok(())
}

#[test]
fn test_blip_serialize_round_trip() -> anyhow::Result<()> {
    let session = session();
    let root = session.load_blip(blip_data(json!({})))?;

    let json = serde_json::to_string(&root.serialize())?;
    let reloaded = EditSession::new(SessionOptions::default())?
        .load_blip(serde_json::from_str(&json)?)?;

    assert_eq!(reloaded.serialize(), root.serialize());
    assert!(reloaded.is_root());
    Ok(())
}

#[test]
fn test_document_operations() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;

    assert_eq!(blip.find("\n").len(), 2);

    blip.first("world").replace("jupiter")?;
    let lines: Vec<String> = blip.text().split('\n').map(str::to_string).collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "hello jupiter!");

    blip.range(2, 5).delete()?;
    assert!(blip.text().starts_with("\nho jupiter"));

    blip.first("ho").insert_after("la")?;
    assert!(blip.text().starts_with("\nhola jupiter"));

    blip.at(3).insert(" ")?;
    assert!(blip.text().starts_with("\nho la jupiter"));
    Ok(())
}

#[test]
fn test_element_handling() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;
    let url = "http://www.test.com/image.png";
    let image_query = || Query::element(ElementType::Image).with_restriction("url", url);

    let org_len = blip.len() as i64;
    blip.append(Element::image(url))?;
    assert_eq!(blip.find(image_query()).len(), 1);

    blip.at(1).insert("twelve chars")?;
    assert!(blip.text().starts_with("\ntwelve charshello"));
    assert!(blip.at(org_len + 12).value()?.as_element().is_some());

    blip.first("twelve ").delete()?;
    assert!(blip.text().starts_with("\nchars"));
    assert!(blip.at(org_len + 12 - 7).value()?.as_element().is_some());

    blip.first("chars").replace(Element::image(url))?;
    assert_eq!(blip.find(image_query()).len(), 2);
    assert!(blip.text().starts_with("\n hello"));
    assert_eq!(
        blip.at(1).value()?.as_element().map(|e| e.element_type().clone()),
        Some(ElementType::Image)
    );
    Ok(())
}

#[test]
fn test_annotation_handling() -> anyhow::Result<()> {
    let key = names::FONT_WEIGHT;
    let session = session();
    let blip = session.load_blip(blip_data(json!({
        "annotations": [{"range": {"start": 3, "end": 6}, "name": key, "value": "bold"}]
    })))?;
    let bold_end = |blip: &wavekit_editor::Blip| {
        blip.document()
            .annotations()
            .get(key)
            .and_then(|list| list.iter().find(|a| a.value() == "bold").map(|a| a.end()))
    };

    assert_eq!(blip.document().annotations().len(), 1);
    assert!(blip.document().annotations().contains(key));

    // Extend by annotating an overlapping range with the same value
    blip.range(5, 8).annotate(key, "bold")?;
    assert_eq!(blip.document().annotations().len(), 1);
    assert_eq!(bold_end(&blip), Some(8));

    // A different value clips the existing one
    blip.range(4, 12).annotate(key, "italic")?;
    assert_eq!(style_ranges(&blip, key).len(), 2);
    assert_eq!(bold_end(&blip), Some(4));

    // Clearing the middle splits the italic range
    blip.range(6, 7).clear_annotation(key)?;
    assert_eq!(style_ranges(&blip, key).len(), 3);

    assert_eq!(blip.document().annotations().names().count(), 1);
    assert_eq!(blip.document().annotations().iter().count(), 3);
    blip.range(3, 5).annotate("foo", "bar")?;
    assert_eq!(blip.document().annotations().names().count(), 2);
    assert_eq!(blip.document().annotations().iter().count(), 4);
    blip.range(3, 5).clear_annotation("foo")?;

    blip.whole().clear_annotation(key)?;
    assert!(blip.document().annotations().get(key).is_none());
    assert!(!blip.serialize().document.annotations.iter().any(|a| a.name == key));
    Ok(())
}

#[test]
fn test_blip_operations() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;
    assert_eq!(session.blips().len(), 1);

    let reply = blip.reply()?;
    reply.append("hello world")?;
    assert_eq!(reply.text(), "hello world");
    assert_eq!(reply.parent_blip_id(), Some(blip.blip_id()));
    assert!(blip.child_blip_ids().contains(&reply.blip_id()));
    assert_eq!(session.blips().len(), 2);

    let another = blip.continue_thread()?;
    another.append("hello world")?;
    assert_eq!(another.text(), "hello world");
    assert_eq!(another.parent_blip_id(), blip.parent_blip_id());
    assert_eq!(session.blips().len(), 3);

    let inline = blip.insert_inline_blip(3)?;
    assert_eq!(inline.parent_blip_id(), Some(blip.blip_id()));
    assert_eq!(session.blips().len(), 4);
    Ok(())
}

#[test]
fn test_inline_blip_cannot_be_inserted_at_the_beginning() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;

    let err = blip.insert_inline_blip(0).unwrap_err();
    assert!(matches!(err, EditorError::InvalidPosition(0)));
    assert_eq!(session.blips().len(), 1);
    assert_eq!(session.pending_count(), 0);
    Ok(())
}

#[test]
fn test_document_modify() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;

    blip.whole().replace("a text with text and then some text")?;
    blip.at(7).insert("text ")?;
    blip.all("text").replace("thing")?;
    assert_eq!(blip.text(), "a thing thing with thing and then some thing");
    Ok(())
}

#[test]
fn test_iteration_is_ascending() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;

    blip.whole().replace("aaa 012 aaa 345 aaa 322")?;
    let hits = blip.all("aaa").hits();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|pair| pair[0].0 < pair[1].0));
    Ok(())
}

#[test]
fn test_blip_ref_value() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;

    let mut content: Vec<char> = blip.text().chars().collect();
    content.remove(4);
    blip.at(4).delete()?;
    assert_eq!(blip.text(), content.iter().collect::<String>());

    content.remove(2);
    blip.range(2, 3).delete()?;
    assert_eq!(blip.text(), content.iter().collect::<String>());

    blip.range(2, 3).replace("bike")?;
    content.splice(2..3, "bike".chars());
    assert_eq!(blip.text(), content.iter().collect::<String>());

    let url = "http://www.test.com/image.png";
    blip.append(Element::image(url))?;
    let image_url = |blip: &wavekit_editor::Blip| -> anyhow::Result<Option<String>> {
        let value = blip.first(ElementType::Image).value()?;
        Ok(value.as_element().and_then(|e| e.get_str("url")).map(str::to_string))
    };
    assert_eq!(image_url(&blip)?.as_deref(), Some(url));

    let url2 = "http://www.test.com/another.png";
    let mut updates = Properties::new();
    updates.insert("url".to_string(), url2.into());
    blip.at(-1).update_element(updates)?;
    assert_eq!(image_url(&blip)?.as_deref(), Some(url2));

    let slice: String = blip.text().chars().skip(3).take(2).collect();
    assert_eq!(blip.range(3, 5).value()?, HitValue::Text(slice));

    blip.append("geheim")?;
    assert!(blip.first("geheim").has_hits());
    assert!(!blip.first(ElementType::Button).has_hits());
    assert!(matches!(
        blip.first(ElementType::Button).value(),
        Err(EditorError::NoMatch)
    ));

    blip.append(Element::button("test1", "Click"))?;
    let button = blip.first(ElementType::Button);
    let mut updates = Properties::new();
    updates.insert("name".to_string(), "test2".into());
    button.update_element(updates)?;
    let value = button.value()?;
    assert_eq!(value.as_element().and_then(|e| e.get_str("name")), Some("test2"));
    Ok(())
}

#[test]
fn test_replace_whole_document() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;

    blip.whole().replace("\nxxxx")?;
    blip.all("yyy").replace("zzz")?;
    assert_eq!(blip.text(), "\nxxxx");
    Ok(())
}

fn foo_bar(session: &EditSession, start: usize, end: usize) -> anyhow::Result<wavekit_editor::Blip> {
    Ok(session.load_blip(blip_data(json!({
        "content": "\nFoo bar.",
        "elements": {},
        "annotations": [{"range": {"start": start, "end": end}, "name": "style", "value": "bold"}]
    })))?)
}

#[test]
fn test_delete_range_across_annotation_end() -> anyhow::Result<()> {
    let session = session();
    let blip = foo_bar(&session, 1, 3)?;

    blip.range(2, 4).delete()?;
    assert_eq!(blip.text(), "\nF bar.");
    assert_eq!(style_ranges(&blip, "style"), vec![(1, 2)]);
    Ok(())
}

#[test]
fn test_insert_at_annotation_start() -> anyhow::Result<()> {
    let session = session();
    let blip = foo_bar(&session, 4, 9)?;

    blip.at(4).insert("d and")?;
    assert_eq!(blip.text(), "\nFood and bar.");
    assert_eq!(style_ranges(&blip, "style"), vec![(9, 14)]);
    Ok(())
}

#[test]
fn test_delete_range_inside_annotation() -> anyhow::Result<()> {
    let session = session();
    let blip = foo_bar(&session, 1, 5)?;

    blip.range(2, 4).delete()?;
    assert_eq!(blip.text(), "\nF bar.");
    assert_eq!(style_ranges(&blip, "style"), vec![(1, 3)]);
    Ok(())
}

#[test]
fn test_replace_inside_annotation() -> anyhow::Result<()> {
    let session = session();
    let blip = foo_bar(&session, 1, 5)?;

    blip.range(2, 4).replace("ooo")?;
    assert_eq!(blip.text(), "\nFooo bar.");
    assert_eq!(style_ranges(&blip, "style"), vec![(1, 6)]);

    blip.range(2, 5).replace("o")?;
    assert_eq!(blip.text(), "\nFo bar.");
    assert_eq!(style_ranges(&blip, "style"), vec![(1, 4)]);
    Ok(())
}

#[test]
fn test_replace_span_past_annotation() -> anyhow::Result<()> {
    let session = session();
    let blip = foo_bar(&session, 1, 4)?;

    blip.range(2, 9).replace("")?;
    assert_eq!(blip.text(), "\nF");
    assert_eq!(style_ranges(&blip, "style"), vec![(1, 2)]);
    Ok(())
}

#[test]
fn test_search_without_match_queues_nothing() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;

    assert!(!blip.text().contains(":("));
    assert_eq!(session.pending_count(), 0);
    assert!(blip.all(":(").replace(":)")?.is_none());
    assert_eq!(session.pending_count(), 0);
    Ok(())
}

#[test]
fn test_blips_remove_unlinks_parent() -> anyhow::Result<()> {
    let session = session();
    session.load_blip(blip_data(json!({"childBlipIds": [CHILD_BLIP_ID]})))?;
    session.load_blip(blip_data(json!({
        "blipId": CHILD_BLIP_ID,
        "parentBlipId": ROOT_BLIP_ID
    })))?;

    session.blips().remove(CHILD_BLIP_ID);
    assert_eq!(session.blips().len(), 1);
    assert!(session.blip(ROOT_BLIP_ID)?.child_blip_ids().is_empty());
    Ok(())
}

#[test]
fn test_append_markup() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({"content": "\nFoo bar.", "elements": {}})))?;

    blip.append_markup("<p><span>markup<span> content</p>")?;
    assert_eq!(session.pending_count(), 1);
    assert_eq!(blip.text(), "\nFoo bar.\nmarkup content");
    Ok(())
}

#[test]
fn test_append_markup_decodes_entities() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({"content": "\n", "elements": {}, "annotations": []})))?;

    let op = blip.append_markup("<p>caf&eacute; &copy; 2024</p>")?;
    assert_eq!(op.params["content"], "<p>caf&eacute; &copy; 2024</p>");
    assert_eq!(blip.text(), "\n\ncafé © 2024");
    Ok(())
}

#[test]
fn test_computed_values_may_read_the_blip() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({"content": "ab ab", "elements": {}, "annotations": []})))?;

    let reader = blip.clone();
    let length_tag = Payload::<Content>::computed(move |_, start, _| {
        format!("{}@{start}", reader.len()).into()
    });
    blip.all("b").replace(length_tag)?;

    assert_eq!(blip.text(), "a5@1 a5@4");
    Ok(())
}

#[test]
fn test_bundled_annotations() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({"content": "\nFoo bar.", "elements": {}})))?;

    blip.append("not bold")?;
    blip.append_with("bold", &[(names::FONT_WEIGHT, "bold")])?;

    let annotations = blip.document().annotations().clone();
    assert_eq!(annotations.len(), 2);
    let bold = &annotations.get(names::FONT_WEIGHT).expect("bold label")[0];
    assert_eq!(bold.value(), "bold");
    assert_eq!((bold.start(), bold.end()), (17, 21));
    Ok(())
}

#[test]
fn test_inline_blip_offset() -> anyhow::Result<()> {
    let session = session();
    session.load_blip(blip_data(json!({
        "childBlipIds": [CHILD_BLIP_ID],
        "elements": {"14": {"type": "INLINE_BLIP", "properties": {"id": CHILD_BLIP_ID}}}
    })))?;
    let child = session.load_blip(blip_data(json!({
        "blipId": CHILD_BLIP_ID,
        "parentBlipId": ROOT_BLIP_ID
    })))?;

    assert_eq!(child.inline_blip_offset(), 14);
    assert_eq!(session.blip(ROOT_BLIP_ID)?.inline_blip_offset(), -1);
    Ok(())
}

#[test]
fn test_proxy_view_shares_state() -> anyhow::Result<()> {
    let session = session();
    let blip = session.load_blip(blip_data(json!({})))?;
    let proxy = blip.proxy_for("helper")?;

    let op = proxy.first("world").replace("there")?.expect("operation");
    assert_eq!(blip.text(), "\nhello there!\nanother line");
    assert_eq!(op.param("proxyingFor"), Some(&json!("helper")));

    blip.first("another").delete()?;
    assert_eq!(proxy.text(), "\nhello there!\n line");
    assert_eq!(session.pending_count(), 2);
    assert_eq!(session.queue().operations()[1].param("proxyingFor"), None);

    assert!(matches!(
        blip.proxy_for("bad@id"),
        Err(EditorError::InvalidProxyId(_))
    ));
    Ok(())
}
