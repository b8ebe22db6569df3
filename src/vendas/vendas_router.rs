// src/vendas/vendas_router.rs

use actix_web::{get, post, web, HttpResponse};
use bigdecimal::BigDecimal;
use uuid::Uuid;

// Importa o AppState do módulo raiz (main.rs)
use crate::AppState;
// Importa GenericResponse e os erros da API do módulo shared
use crate::shared::erros::ErroApi;
use crate::shared::shared_structs::GenericResponse;

use super::vendas_structs::{
    EventoResumo, FiltroVendas, ItemDetalhe, ItemDetalheRow, NovaVendaRequest, ProdutoResumo,
    VendaDetalhe, VendaResumo,
};

/// Rota que fecha o carrinho do caixa. O pedido inteiro é validado e
/// registrado pelo `Caixa` dentro de uma única transação: evento, forma de
/// pagamento, ofertas, estoque, total e decrementos. Em caso de sucesso
/// devolve a venda completa, que o caixa usa para imprimir o cupom.
#[post("/vendas")]
pub async fn registrar_venda(
    data: web::Data<AppState>,
    pedido: web::Json<NovaVendaRequest>,
) -> Result<HttpResponse, ErroApi> {
    let venda = data.caixa.registrar_venda(pedido.into_inner()).await?;

    Ok(HttpResponse::Created()
        .json(GenericResponse::sucesso("Venda registrada com sucesso!", venda)))
}

/// Rota que lista as vendas mais recentes, da mais nova para a mais antiga,
/// com filtro opcional por evento.
#[get("/vendas")]
pub async fn buscar_vendas(
    data: web::Data<AppState>,
    filtro: web::Query<FiltroVendas>,
) -> Result<HttpResponse, ErroApi> {
    let limite = filtro.limit.unwrap_or(50).clamp(1, 200);

    let vendas: Vec<VendaResumo> = match filtro.evento_id {
        Some(evento_id) => {
            sqlx::query_as(
                "SELECT id, evento_id, data_hora, valor_total, forma_pagamento, status
                 FROM vendas
                 WHERE evento_id = $1
                 ORDER BY data_hora DESC
                 LIMIT $2",
            )
            .bind(evento_id)
            .bind(limite)
            .fetch_all(&data.db_pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT id, evento_id, data_hora, valor_total, forma_pagamento, status
                 FROM vendas
                 ORDER BY data_hora DESC
                 LIMIT $1",
            )
            .bind(limite)
            .fetch_all(&data.db_pool)
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(GenericResponse::sucesso("Vendas listadas com sucesso!", vendas)))
}

/// Rota que busca uma venda pelo id, com o evento e os itens detalhados no
/// formato que a impressão do cupom consome.
#[get("/vendas/{id}")]
pub async fn buscar_venda_por_id(
    data: web::Data<AppState>,
    caminho: web::Path<Uuid>,
) -> Result<HttpResponse, ErroApi> {
    let venda_id = caminho.into_inner();

    let venda: VendaResumo = sqlx::query_as(
        "SELECT id, evento_id, data_hora, valor_total, forma_pagamento, status
         FROM vendas
         WHERE id = $1",
    )
    .bind(venda_id)
    .fetch_optional(&data.db_pool)
    .await?
    .ok_or(ErroApi::VendaNaoEncontrada(venda_id))?;

    let evento: EventoResumo = sqlx::query_as("SELECT id, nome FROM eventos WHERE id = $1")
        .bind(venda.evento_id)
        .fetch_one(&data.db_pool)
        .await?;

    let linhas: Vec<ItemDetalheRow> = sqlx::query_as(
        "SELECT vi.id, vi.quantidade, vi.preco_unitario,
                p.id AS produto_id, p.nome AS nome_produto,
                p.descricao AS descricao_produto, c.nome AS categoria_nome
         FROM venda_itens vi
         JOIN produtos_evento pe ON pe.id = vi.produto_evento_id
         JOIN produtos p ON p.id = pe.produto_id
         JOIN categorias c ON c.id = p.categoria_id
         WHERE vi.venda_id = $1
         ORDER BY p.nome",
    )
    .bind(venda_id)
    .fetch_all(&data.db_pool)
    .await?;

    let itens = linhas
        .into_iter()
        .map(|linha| {
            let subtotal = &linha.preco_unitario * &BigDecimal::from(linha.quantidade);
            ItemDetalhe {
                id: linha.id,
                quantidade: linha.quantidade,
                preco_unitario: linha.preco_unitario,
                subtotal,
                produto: ProdutoResumo {
                    id: linha.produto_id,
                    nome: linha.nome_produto,
                    descricao: linha.descricao_produto,
                    categoria: linha.categoria_nome,
                },
            }
        })
        .collect();

    let detalhe = VendaDetalhe {
        id: venda.id,
        data_hora: venda.data_hora,
        valor_total: venda.valor_total,
        forma_pagamento: venda.forma_pagamento,
        status: venda.status,
        evento,
        itens,
    };

    Ok(HttpResponse::Ok().json(GenericResponse::sucesso("Detalhes da venda", detalhe)))
}
