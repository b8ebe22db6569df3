// src/main.rs

use actix_web::{web, App, HttpServer};
use sqlx::{Pool, Postgres};
use tracing::info;

// Importa os módulos
//
// O Rust encontrará o arquivo `src/<modulo>/mod.rs` e, a partir dele, os submódulos.
mod produtos; // Módulo de produtos (vitrine dos eventos)
mod vendas; // Módulo de vendas (caixa)
mod shared; // Módulo shared (envelope de resposta e erros)

use vendas::vendas_caixa::Caixa;
use vendas::vendas_store::PgVendaStore;

// Estado compartilhado da aplicação: o pool de conexões para as rotas de
// leitura e o caixa que registra as vendas.
pub struct AppState {
    pub db_pool: Pool<Postgres>,
    pub caixa: Caixa<PgVendaStore>,
}

// Função principal da aplicação Actix Web.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Carrega o .env se existir (em produção as variáveis vêm do ambiente).
    dotenvy::dotenv().ok();

    // Logs estruturados, com o nível controlado por RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // URL de conexão com o banco de dados PostgreSQL.
    // O tipo das colunas de preço é NUMERIC, compatível com bigdecimal::BigDecimal.
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL precisa estar definida");
    let bind_addr =
        std::env::var("QUERMESSE_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    // Conecta ao banco de dados PostgreSQL usando um pool de conexões.
    // O .expect() fará com que o programa entre em pânico se a conexão falhar.
    let db_pool = Pool::<Postgres>::connect(&database_url)
        .await
        .expect("Falha ao conectar ao banco PostgreSQL");

    // Aplica as migrações pendentes de ./migrations antes de aceitar tráfego.
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .expect("Falha ao aplicar as migrações");

    // Cria um estado compartilhado da aplicação com o pool de conexões e o
    // caixa. web::Data é usado para compartilhar dados imutáveis entre as rotas.
    let app_state = web::Data::new(AppState {
        db_pool: db_pool.clone(),
        caixa: Caixa::novo(PgVendaStore::new(db_pool)),
    });

    info!(endereco = %bind_addr, "iniciando API da quermesse");

    // Configura e inicia o servidor HTTP.
    HttpServer::new(move || {
        App::new()
            // Adiciona o estado compartilhado à aplicação.
            // .clone() é necessário porque a closure é movida
            // e pode ser executada várias vezes.
            .app_data(app_state.clone())

            // Módulo de Produtos (vitrine do evento)
            .service(produtos::produtos_router::buscar_produtos_do_evento)

            // Módulo de Vendas (caixa)
            .service(vendas::vendas_router::registrar_venda)
            .service(vendas::vendas_router::buscar_vendas)
            .service(vendas::vendas_router::buscar_venda_por_id)
    })
    // Vincula o servidor ao endereço IP e porta. O '?' propaga erros.
    .bind(bind_addr.as_str())?
    // Inicia o servidor.
    .run()
    // Aguarda a finalização do servidor.
    .await
}
