// src/vendas/vendas_caixa.rs

use bigdecimal::BigDecimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::shared::erros::ErroApi;

use super::vendas_store::{ErroStore, VendaStore, VendaTx};
use super::vendas_structs::{
    FormaPagamento, NovaVendaRequest, RegistroItem, RegistroVenda, Venda,
};

/// Número máximo de tentativas quando o banco sinaliza conflito de escrita.
const MAX_TENTATIVAS: u32 = 3;

/// Linha do pedido depois da normalização (linhas repetidas já somadas).
struct LinhaPedido {
    produto_evento_id: Uuid,
    quantidade: i32,
}

/// Pedido com a estrutura validada, pronto para a fase transacional.
struct PedidoNormalizado {
    forma_pagamento: FormaPagamento,
    linhas: Vec<LinhaPedido>,
}

/// O caixa da quermesse: valida o carrinho contra o estoque corrente do
/// evento, calcula o total e registra a venda com os decrementos de estoque
/// em uma única transação.
pub struct Caixa<S: VendaStore> {
    store: S,
}

impl<S: VendaStore> Caixa<S> {
    pub fn novo(store: S) -> Self {
        Caixa { store }
    }

    /// Registra uma venda a partir do carrinho montado no caixa.
    ///
    /// Passos, todos dentro de uma única transação:
    /// 1. Confere se o evento existe.
    /// 2. Valida a estrutura do pedido: pelo menos um item, forma de
    ///    pagamento reconhecida, quantidades positivas. Linhas repetidas do
    ///    mesmo produto são somadas antes da conferência de estoque.
    /// 3. Trava cada oferta do evento e captura o preço e o estoque correntes.
    /// 4. Confere o estoque, calcula o total e persiste a venda com os itens.
    /// 5. Decrementa o estoque de cada oferta, com re-validação, e confirma.
    ///
    /// Um conflito de escrita sinalizado pelo banco é tentado de novo em uma
    /// transação nova, com leituras novas, em no máximo `MAX_TENTATIVAS`
    /// vezes. Estoque que acabou entre a leitura e a confirmação é rejeição
    /// de negócio e não ganha nova tentativa.
    pub async fn registrar_venda(&self, pedido: NovaVendaRequest) -> Result<Venda, ErroApi> {
        let mut tentativa = 1;
        loop {
            match self.tentar_registrar(&pedido).await {
                Ok(venda) => {
                    info!(
                        venda_id = %venda.id,
                        evento_id = %venda.evento_id,
                        valor_total = %venda.valor_total,
                        itens = venda.itens.len(),
                        "venda registrada"
                    );
                    return Ok(venda);
                }
                Err(ErroApi::FalhaTransacao(ErroStore::Conflito))
                    if tentativa < MAX_TENTATIVAS =>
                {
                    warn!(tentativa, "conflito de escrita ao registrar venda, tentando de novo");
                    tentativa += 1;
                }
                Err(erro) => return Err(erro),
            }
        }
    }

    async fn tentar_registrar(&self, pedido: &NovaVendaRequest) -> Result<Venda, ErroApi> {
        let mut tx = self.store.iniciar().await?;

        // O evento vem antes de qualquer outra validação: um carrinho ruim
        // para um evento que não existe é respondido como evento inexistente.
        if !tx.evento_existe(pedido.evento_id).await? {
            return Err(ErroApi::EventoNaoEncontrado(pedido.evento_id));
        }

        let normalizado = normalizar(pedido)?;

        // As linhas chegam ordenadas por id da oferta, então duas vendas
        // concorrentes travam as mesmas ofertas sempre na mesma ordem.
        let mut valor_total = BigDecimal::from(0);
        let mut itens = Vec::with_capacity(normalizado.linhas.len());
        for linha in &normalizado.linhas {
            let oferta = tx
                .travar_oferta(linha.produto_evento_id)
                .await?
                .ok_or(ErroApi::OfertaNaoEncontrada(linha.produto_evento_id))?;

            // Oferta de outro evento não é vendida neste caixa.
            if oferta.evento_id != pedido.evento_id {
                return Err(ErroApi::OfertaNaoEncontrada(linha.produto_evento_id));
            }

            if oferta.estoque < linha.quantidade {
                warn!(
                    oferta_id = %linha.produto_evento_id,
                    produto = %oferta.nome_produto,
                    disponivel = oferta.estoque,
                    solicitado = linha.quantidade,
                    "estoque insuficiente"
                );
                return Err(ErroApi::EstoqueInsuficiente {
                    oferta_id: linha.produto_evento_id,
                    disponivel: oferta.estoque,
                    solicitado: linha.quantidade,
                });
            }

            // O preço unitário é o capturado agora, dentro da transação. É
            // ele que vale para o subtotal e para o item registrado, mesmo
            // que a oferta seja editada depois.
            let quantidade_bigdecimal = BigDecimal::from(linha.quantidade);
            valor_total += &oferta.preco * &quantidade_bigdecimal;
            itens.push(RegistroItem {
                produto_evento_id: linha.produto_evento_id,
                quantidade: linha.quantidade,
                preco_unitario: oferta.preco,
            });
        }

        // Registro e decrementos na mesma transação: ou a venda inteira
        // entra com o estoque descontado, ou nada acontece.
        let registro = RegistroVenda {
            evento_id: pedido.evento_id,
            forma_pagamento: normalizado.forma_pagamento,
            valor_total,
            itens,
        };
        let venda = tx.inserir_venda(&registro).await?;
        for item in &registro.itens {
            tx.decrementar_estoque(item.produto_evento_id, item.quantidade)
                .await?;
        }
        tx.confirmar().await?;

        Ok(venda)
    }
}

/// Valida a estrutura do pedido e soma as linhas repetidas do mesmo produto,
/// para que o impacto total no estoque seja conferido de uma vez só.
fn normalizar(pedido: &NovaVendaRequest) -> Result<PedidoNormalizado, ErroApi> {
    if pedido.itens.is_empty() {
        return Err(ErroApi::PedidoInvalido(
            "a venda precisa de pelo menos um item".to_string(),
        ));
    }

    let forma_pagamento = FormaPagamento::interpretar(&pedido.forma_pagamento).ok_or_else(|| {
        ErroApi::PedidoInvalido(format!(
            "forma de pagamento desconhecida: {}",
            pedido.forma_pagamento
        ))
    })?;

    let mut linhas: Vec<LinhaPedido> = Vec::with_capacity(pedido.itens.len());
    for item in &pedido.itens {
        if item.quantidade <= 0 {
            return Err(ErroApi::PedidoInvalido(format!(
                "quantidade inválida para o produto {}: {}",
                item.produto_evento_id, item.quantidade
            )));
        }

        match linhas
            .iter_mut()
            .find(|linha| linha.produto_evento_id == item.produto_evento_id)
        {
            Some(linha) => {
                linha.quantidade = linha.quantidade.checked_add(item.quantidade).ok_or_else(
                    || {
                        ErroApi::PedidoInvalido(format!(
                            "quantidade total excede o limite para o produto {}",
                            item.produto_evento_id
                        ))
                    },
                )?;
            }
            None => linhas.push(LinhaPedido {
                produto_evento_id: item.produto_evento_id,
                quantidade: item.quantidade,
            }),
        }
    }

    // Ordem estável de travamento das ofertas.
    linhas.sort_by_key(|linha| linha.produto_evento_id);

    Ok(PedidoNormalizado {
        forma_pagamento,
        linhas,
    })
}
