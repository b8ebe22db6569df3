// src/produtos/produtos_router.rs

use actix_web::{get, web, HttpResponse};
use sqlx::query_as;
use uuid::Uuid;

// Importa as structs definidas no módulo `produtos_structs` dentro da mesma pasta `produtos`
use super::produtos_structs::ProdutoEventoDetalhe;

// Importa o AppState e os erros da API do nível raiz do crate
use crate::shared::erros::ErroApi;
use crate::AppState;

/// Rota que lista os produtos à venda em um evento, com o preço e o estoque
/// correntes de cada oferta. É a vitrine que o caixa usa para montar o
/// carrinho, então os nomes de produto e categoria já vêm resolvidos.
#[get("/eventos/{evento_id}/produtos")]
pub async fn buscar_produtos_do_evento(
    data: web::Data<AppState>,
    caminho: web::Path<Uuid>,
) -> Result<HttpResponse, ErroApi> {
    let evento_id = caminho.into_inner();

    let existe: (bool,) = query_as("SELECT EXISTS (SELECT 1 FROM eventos WHERE id = $1)")
        .bind(evento_id)
        .fetch_one(&data.db_pool)
        .await?;
    if !existe.0 {
        return Err(ErroApi::EventoNaoEncontrado(evento_id));
    }

    let produtos: Vec<ProdutoEventoDetalhe> = query_as(
        "SELECT pe.id, pe.produto_id, pe.evento_id, pe.preco, pe.estoque,
                p.nome AS nome_produto, p.descricao AS descricao_produto,
                c.nome AS categoria_nome
         FROM produtos_evento pe
         JOIN produtos p ON p.id = pe.produto_id
         JOIN categorias c ON c.id = p.categoria_id
         WHERE pe.evento_id = $1
         ORDER BY p.nome",
    )
    .bind(evento_id)
    .fetch_all(&data.db_pool)
    .await?;

    // A vitrine volta como lista simples, sem envelope.
    Ok(HttpResponse::Ok().json(produtos))
}
