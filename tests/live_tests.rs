//! Runs against a real project. Needs SUPABASE_URL, SUPABASE_KEY,
//! TEST_EMAIL, TEST_PASSWORD and TEST_PRODUCT_ID, e.g. in a `.env` file.

use dotenv::dotenv;
use supabase_storefront::Supabase;

#[tokio::test]
#[ignore = "requires a live Supabase project"]
async fn test_live_cart_roundtrip() {
    dotenv().ok();

    let supabase = Supabase::from_env().expect("SUPABASE_URL and SUPABASE_KEY must be set");
    let email = std::env::var("TEST_EMAIL").expect("TEST_EMAIL must be set");
    let password = std::env::var("TEST_PASSWORD").expect("TEST_PASSWORD must be set");
    let product_id = std::env::var("TEST_PRODUCT_ID").expect("TEST_PRODUCT_ID must be set");

    let session = supabase.session_store();
    session.sign_in(&email, &password).await.unwrap();

    let cart = supabase.cart_store();
    cart.remove_item(&product_id).await;
    assert!(cart.line_for(&product_id).is_none());

    let report = cart.add_item(&product_id).await;
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(cart.line_for(&product_id).map(|l| l.quantity), Some(1));

    cart.add_item(&product_id).await;
    assert_eq!(cart.line_for(&product_id).map(|l| l.quantity), Some(2));

    cart.update_quantity(&product_id, 0).await;
    assert!(cart.line_for(&product_id).is_none());

    session.sign_out().await;
    assert!(session.identity().is_none());
}
