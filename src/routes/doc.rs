use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartDto, CartItemDto, ClearCartRequest, Quantity},
        identity::{CustomerQuery, ExternalId, Identity},
        orders::{CheckoutRequest, OrderDto, OrderItemDto, OrderList, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{Customer, Product},
    response::{ApiResponse, Meta},
    routes::{cart, health, orders, params, products},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        cart::get_cart,
        cart::add_to_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::update_order_status,
    ),
    components(
        schemas(
            Customer,
            Product,
            ExternalId,
            Identity,
            CustomerQuery,
            Quantity,
            AddToCartRequest,
            ClearCartRequest,
            CartItemDto,
            CartDto,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderItemDto,
            OrderDto,
            OrderList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            params::Pagination,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartDto>,
            ApiResponse<OrderDto>,
            ApiResponse<OrderList>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
