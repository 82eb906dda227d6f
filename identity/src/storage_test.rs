use super::*;

#[test]
fn tabs_share_entries() {
    let shared = SharedStorage::new();
    let a = shared.open_tab();
    let b = shared.open_tab();
    a.set(LOCALE_KEY, "en");
    assert_eq!(b.get(LOCALE_KEY).as_deref(), Some("en"));
    assert_ne!(a.tab_id(), b.tab_id());
}

#[test]
fn flag_requires_exact_true() {
    let tab = SharedStorage::new().open_tab();
    tab.set(ADMIN_FLAG_KEY, "yes");
    assert!(!tab.flag(ADMIN_FLAG_KEY));
    tab.set_flag(ADMIN_FLAG_KEY, true);
    assert!(tab.flag(ADMIN_FLAG_KEY));
    tab.set_flag(ADMIN_FLAG_KEY, false);
    assert!(tab.get(ADMIN_FLAG_KEY).is_none());
}

#[tokio::test]
async fn other_tab_receives_event() {
    let shared = SharedStorage::new();
    let writer = shared.open_tab();
    let reader = shared.open_tab();
    let mut sub = reader.subscribe();

    writer.set_flag(GUEST_FLAG_KEY, true);

    let event = sub.next().await.unwrap();
    assert_eq!(event.key.as_deref(), Some(GUEST_FLAG_KEY));
    assert_eq!(event.new_value.as_deref(), Some("true"));
    assert!(event.old_value.is_none());
}

#[tokio::test]
async fn own_writes_are_not_echoed() {
    let shared = SharedStorage::new();
    let tab = shared.open_tab();
    let other = shared.open_tab();
    let mut sub = tab.subscribe();

    tab.set(LOCALE_KEY, "es");
    other.set(LOCALE_KEY, "en");

    let event = sub.next().await.unwrap();
    assert_eq!(event.new_value.as_deref(), Some("en"));
}

#[tokio::test]
async fn identical_write_raises_no_event() {
    let shared = SharedStorage::new();
    let writer = shared.open_tab();
    let reader = shared.open_tab();
    writer.set(LOCALE_KEY, "es");
    let mut sub = reader.subscribe();

    writer.set(LOCALE_KEY, "es");
    writer.remove("missing");
    writer.set(LOCALE_KEY, "en");

    let event = sub.next().await.unwrap();
    assert_eq!(event.old_value.as_deref(), Some("es"));
    assert_eq!(event.new_value.as_deref(), Some("en"));
}

#[tokio::test]
async fn clear_emits_keyless_event() {
    let shared = SharedStorage::new();
    let writer = shared.open_tab();
    let reader = shared.open_tab();
    writer.set_flag(ADMIN_FLAG_KEY, true);
    let mut sub = reader.subscribe();

    writer.clear();

    let event = sub.next().await.unwrap();
    assert!(event.key.is_none());
    assert!(event.touches(ADMIN_FLAG_KEY));
    assert!(reader.get(ADMIN_FLAG_KEY).is_none());
}

#[test]
fn touches_matches_only_named_key() {
    let event = StorageEvent { key: Some(LOCALE_KEY.into()), old_value: None, new_value: None, origin: 1 };
    assert!(event.touches(LOCALE_KEY));
    assert!(!event.touches(ADMIN_FLAG_KEY));
}
