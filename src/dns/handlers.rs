use crate::dns::passthrough::Passthrough;
use crate::dns::records;
use crate::error::Error;
use crate::rules::{Answer, QueryContext, ResourceClass, RuleSet};
use std::sync::Arc;
use tracing::{error, warn};
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_server::client::rr::{LowerName, Name, Record};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

#[derive(Clone)]
pub struct Handler {
    rules: Arc<RuleSet>,
    passthrough: Option<Passthrough>,
}

impl Handler {
    /// Answer queries from `rules`. Unanswered queries get NXDOMAIN, or are forwarded when a
    /// `passthrough` upstream is given.
    #[must_use]
    pub fn new(rules: Arc<RuleSet>, passthrough: Option<Passthrough>) -> Self {
        Handler { rules, passthrough }
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response: R,
    ) -> Result<ResponseInfo, Error> {
        // If it isn't a query, return NOTIMPL.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self.handle_notimpl(request, response).await;
        }

        let query = request.query();
        // Types outside the vocabulary can't match any rule.
        let answers = match ResourceClass::from_record_type(query.query_type()) {
            Some(requested) => {
                let context =
                    QueryContext::new(hostname(query.name()), requested).with_source(request.src());
                match self.evaluate(context).await {
                    Ok(answers) => answers,
                    Err(err) => {
                        error!("failed to answer \"{}\": {err:?}", query.name());
                        return self.send_servfail(request, response).await;
                    }
                }
            }
            None => Vec::new(),
        };

        let records = self.records(query.name().into(), &answers);
        if !records.is_empty() {
            return self.send_auth_resp(request, response, records).await;
        }

        match &self.passthrough {
            Some(passthrough) => {
                self.handle_passthrough(passthrough, request, response)
                    .await
            }
            None => self.send_nxdomain(request, response).await,
        }
    }

    /// Run the rule set off the async workers: reply callbacks may block.
    async fn evaluate(&self, context: QueryContext) -> Result<Vec<Answer>, Error> {
        let rules = Arc::clone(&self.rules);
        tokio::task::spawn_blocking(move || rules.process_query(&context))
            .await
            .map_err(|err| Error::IO(err.into()))?
    }

    fn records(&self, name: Name, answers: &[Answer]) -> Vec<Record> {
        answers
            .iter()
            .filter_map(|answer| match records::to_record(&name, answer) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!("dropping answer for \"{name}\": {err}");
                    None
                }
            })
            .collect()
    }

    async fn handle_notimpl<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }

    async fn send_servfail<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::ServFail))
            .await?)
    }

    async fn handle_passthrough<R: ResponseHandler>(
        &self,
        passthrough: &Passthrough,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let query = request.query();
        let forwarded = match passthrough
            .lookup(query.name().into(), query.query_type())
            .await
        {
            Ok(forwarded) => forwarded,
            Err(err) => {
                error!("passthrough to {} failed: {err:?}", passthrough.upstream());
                return self.send_servfail(request, response_handle).await;
            }
        };
        let builder = MessageResponseBuilder::from_message_request(request);
        let mut header = Header::response_from_request(request.header());
        header.set_recursion_available(true);
        header.set_response_code(forwarded.response_code);
        let response = builder.build(header, forwarded.answers.iter(), &[], &[], &[]);
        Ok(response_handle.send_response(response).await?)
    }

    async fn send_auth_resp<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        records: Vec<Record>,
    ) -> Result<ResponseInfo, Error> {
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(header, records.iter(), &[], &[], &[]);
        Ok(response_handle.send_response(response).await?)
    }

    async fn send_nxdomain<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let builder = MessageResponseBuilder::from_message_request(request);
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_response_code(ResponseCode::NXDomain);
        let response = builder.build_no_records(header);
        Ok(response_handle.send_response(response).await?)
    }
}

/// The queried name as rules see it: lowercase, without the trailing root dot.
fn hostname(name: &LowerName) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

#[async_trait::async_trait]
impl RequestHandler for Handler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
