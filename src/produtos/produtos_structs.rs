// src/produtos/produtos_structs.rs

use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Produto ofertado em um evento, com o preço e o estoque da oferta e os
/// dados do catálogo achatados para a vitrine do caixa.
/// Deriva FromRow para mapeamento direto de resultados de query SQL.
#[derive(Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProdutoEventoDetalhe {
    pub id: Uuid,
    pub produto_id: Uuid,
    pub evento_id: Uuid,
    pub preco: BigDecimal,
    pub estoque: i32,
    pub nome_produto: String,
    pub descricao_produto: Option<String>,
    pub categoria_nome: String,
}
