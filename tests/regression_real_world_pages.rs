use price_watch::{
    Page, WatchConfig, calculate_total, calculate_total_for, extract_price, extract_quantity,
};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn storefront_sale_price_with_currency_code_and_number_input() -> price_watch::Result<()> {
    let html = r#"
    <div class="product__info">
      <div class="price price--on-sale">
        <s class="price-item price-item--regular">€1.499,00 EUR</s>
        <span class="price-item price-item--sale">€1.299,00 EUR</span>
      </div>
      <quantity-input class="quantity">
        <button class="quantity__button" name="minus" type="button">-</button>
        <input class="quantity__input" type="number" name="quantity" id="Quantity-1" value="2" min="1">
        <button class="quantity__button" name="plus" type="button">+</button>
      </quantity-input>
    </div>
    "#;

    let page = Page::from_html(html)?;
    assert_eq!(extract_price(&page, ".price-item--sale"), Some(1299.0));
    assert_eq!(extract_quantity(&page, "#Quantity-1"), Some(2));
    assert_close(
        calculate_total(&page, Some(".price-item--sale"), Some("#Quantity-1")),
        2598.0,
    );
    Ok(())
}

#[test]
fn us_grouped_price_with_select_quantity() -> price_watch::Result<()> {
    let html = r#"
    <span class="a-price"><span class="a-offscreen">$1,049.99</span></span>
    <select name="quantity" id="quantity">
      <option value="1">1</option>
      <option value="2">2</option>
      <option value="3" selected>3</option>
    </select>
    "#;

    let page = Page::from_html(html)?;
    assert_close(
        calculate_total(&page, Some(".a-offscreen"), Some("#quantity")),
        3149.97,
    );

    page.select_option("#quantity", "1")?;
    assert_close(
        calculate_total(&page, Some(".a-offscreen"), Some("#quantity")),
        1049.99,
    );
    Ok(())
}

#[test]
fn price_split_across_inline_markup_reads_as_one_number() -> price_watch::Result<()> {
    let html = r#"
    <p class="price">
      <span class="woocommerce-Price-amount amount"><bdi><span class="woocommerce-Price-currencySymbol">&euro;</span>12<sup>,50</sup></bdi></span>
    </p>
    "#;

    let page = Page::from_html(html)?;
    assert_eq!(extract_price(&page, ".price .amount"), Some(12.5));
    Ok(())
}

#[test]
fn strikethrough_and_current_price_are_told_apart_by_selector() -> price_watch::Result<()> {
    let html = r#"
    <p class="price"><del><span class="amount">€30,00</span></del> <ins><span class="amount">€24,50</span></ins></p>
    "#;

    let page = Page::from_html(html)?;
    assert_eq!(extract_price(&page, ".price ins .amount"), Some(24.5));
    assert_eq!(extract_price(&page, ".price .amount"), Some(30.0));
    Ok(())
}

#[test]
fn custom_stepper_exposes_quantity_through_data_value() -> price_watch::Result<()> {
    let html = r#"
    <span id="price">CHF 45.50</span>
    <div class="qty-stepper" data-value="4">
      <button class="dec">-</button><span class="count">4</span><button class="inc">+</button>
    </div>
    "#;

    let page = Page::from_html(html)?;
    assert_eq!(extract_quantity(&page, ".qty-stepper"), Some(4));
    assert_close(calculate_total(&page, Some("#price"), Some(".qty-stepper")), 182.0);

    page.set_attribute(".qty-stepper", "data-value", "")?;
    assert_eq!(extract_quantity(&page, ".qty-stepper"), None);
    assert_eq!(extract_quantity(&page, ".qty-stepper .count"), Some(4));
    Ok(())
}

#[test]
fn unreadable_inputs_fall_back_to_neutral_values() -> price_watch::Result<()> {
    let html = r#"
    <span id="price">Price on request</span>
    <span id="sale">19.90 €</span>
    <input id="qty-empty" value="">
    <input id="qty-zero" value="0">
    <input id="qty-units" value="3 units">
    "#;

    let page = Page::from_html(html)?;
    assert_eq!(calculate_total(&page, Some("#price"), Some("#qty-units")), 0.0);
    assert_close(calculate_total(&page, Some("#sale"), Some("#qty-empty")), 19.9);
    assert_close(calculate_total(&page, Some("#sale"), Some("#qty-zero")), 19.9);
    assert_close(calculate_total(&page, Some("#sale"), Some("#qty-units")), 59.7);
    assert_close(calculate_total(&page, Some("#sale"), Some("#missing")), 19.9);
    assert_eq!(calculate_total(&page, Some("#missing"), Some("#qty-units")), 0.0);
    assert_eq!(calculate_total(&page, None, None), 0.0);
    Ok(())
}

#[test]
fn config_driven_total_follows_page_edits() -> price_watch::Result<()> {
    let html = r#"
    <div id="buybox"><span class="price">€9,99</span></div>
    <input id="qty" type="number" value="1">
    "#;
    let config = WatchConfig::from_json(
        r##"{"priceSelector": "#buybox .price", "quantitySelector": "#qty"}"##,
    )?;

    let page = Page::from_html(html)?;
    assert_close(calculate_total_for(&page, &config), 9.99);

    page.set_inner_html("#buybox", r#"<span class="price">€12,49</span>"#)?;
    page.set_value("#qty", "2")?;
    assert_close(calculate_total_for(&page, &config), 24.98);
    Ok(())
}
